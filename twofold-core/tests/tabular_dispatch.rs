/*!
End-to-end tests for tabular format resolution and dispatch.
These tests go through the public `tabular::save`/`tabular::load` facade on
real files and on `memory://` paths.
*/

#![cfg(all(feature = "csv", feature = "parquet", feature = "feather"))]

use arrow::array::{Array, ArrayRef, BooleanArray, Float64Array, Int64Array, StringArray};
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use serde_json::json;
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;
use twofold_core::tabular::{self, LoadArgs, SaveArgs};
use twofold_core::{BackendOptions, FilePath, Format, TwofoldError};

fn frame() -> RecordBatch {
    RecordBatch::try_from_iter(vec![
        ("a", Arc::new(Int64Array::from(vec![1, 2, 3])) as ArrayRef),
        ("b", Arc::new(Int64Array::from(vec![4, 5, 6])) as ArrayRef),
    ])
    .unwrap()
}

fn frame_with_nulls() -> RecordBatch {
    RecordBatch::try_from_iter(vec![
        ("id", Arc::new(Int64Array::from(vec![1, 2, 3])) as ArrayRef),
        ("score", Arc::new(Float64Array::from(vec![Some(0.5), None, Some(2.5)])) as ArrayRef),
        ("name", Arc::new(StringArray::from(vec![Some("x"), Some("y"), None])) as ArrayRef),
        ("missing", Arc::new(BooleanArray::from(vec![None, None, None])) as ArrayRef),
    ])
    .unwrap()
}

fn names(batch: &RecordBatch) -> Vec<String> {
    batch.schema().fields().iter().map(|f| f.name().clone()).collect()
}

fn files_in(dir: &TempDir) -> usize {
    fs::read_dir(dir.path()).unwrap().count()
}

#[test]
fn test_roundtrip_every_format_with_explicit_format() {
    let temp_dir = TempDir::new().unwrap();

    for format in Format::ALL {
        let path = temp_dir.path().join(format!("data_{format}"));
        tabular::save(&frame(), path.as_path(), Some(format.name()), BackendOptions::new()).unwrap();
        let loaded = tabular::load(path.as_path(), Some(format.name()), None, BackendOptions::new()).unwrap();

        assert_eq!(names(&loaded), vec!["a", "b"], "format {format}");
        assert_eq!(loaded.columns(), frame().columns(), "format {format}");
    }
}

#[test]
fn test_binary_formats_keep_null_columns_exactly() {
    let temp_dir = TempDir::new().unwrap();

    for suffix in ["parquet", "feather"] {
        let path = temp_dir.path().join(format!("nulls.{suffix}"));
        tabular::save(&frame_with_nulls(), path.as_path(), None, BackendOptions::new()).unwrap();
        let loaded = tabular::load(path.as_path(), None, None, BackendOptions::new()).unwrap();

        assert_eq!(loaded.schema().fields(), frame_with_nulls().schema().fields());
        assert_eq!(loaded.columns(), frame_with_nulls().columns());
        assert_eq!(loaded.column(3).null_count(), 3);
    }
}

#[test]
fn test_csv_all_null_column_loses_its_type() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("nulls.csv");
    let table = RecordBatch::try_from_iter(vec![
        ("id", Arc::new(Int64Array::from(vec![1, 2, 3])) as ArrayRef),
        ("score", Arc::new(Float64Array::from(vec![Some(0.5), None, Some(2.5)])) as ArrayRef),
        ("missing", Arc::new(Float64Array::from(vec![None, None, None])) as ArrayRef),
    ])
    .unwrap();

    tabular::save(&table, path.as_path(), None, BackendOptions::new()).unwrap();
    let loaded = tabular::load(path.as_path(), None, None, BackendOptions::new()).unwrap();

    assert_eq!(names(&loaded), vec!["id", "score", "missing"]);
    assert_eq!(loaded.column(0), table.column(0));
    assert_eq!(loaded.column(1), table.column(1));
    // Text carries no type for a column without values
    assert_eq!(loaded.schema().field(2).data_type(), &DataType::Null);
    assert_eq!(loaded.column(2).len(), 3);
}

#[test]
fn test_suffix_inference() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("data.csv");

    tabular::save(&frame(), path.as_path(), None, BackendOptions::new()).unwrap();
    tabular::save(&frame(), path.as_path(), Some("csv"), BackendOptions::new()).unwrap();

    let text = fs::read_to_string(&path).unwrap();
    assert!(text.starts_with("a,b\n"));

    let loaded = tabular::load(path.as_path(), None, None, BackendOptions::new()).unwrap();
    assert_eq!(loaded.columns(), frame().columns());
    let loaded = tabular::load(path.as_path(), Some("csv"), None, BackendOptions::new()).unwrap();
    assert_eq!(loaded.columns(), frame().columns());
}

#[test]
fn test_uppercase_suffix_is_inferred() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("DATA.PARQUET");

    tabular::save(&frame(), path.as_path(), None, BackendOptions::new()).unwrap();
    let loaded = tabular::load(path.as_path(), Some("parquet"), None, BackendOptions::new()).unwrap();
    assert_eq!(loaded.columns(), frame().columns());
}

#[test]
fn test_conflict_rejected_on_save_without_creating_a_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("data.csv");

    let err = tabular::save(&frame(), path.as_path(), Some("parquet"), BackendOptions::new()).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Conflicting format information: inferred 'csv' from file extension, but format='parquet' was specified"
    );
    assert!(err.is_resolution_error());
    assert!(!path.exists());
    assert_eq!(files_in(&temp_dir), 0);
}

#[test]
fn test_conflict_rejected_for_unknown_suffix_on_save() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("data.txt");

    let err = tabular::save(&frame(), path.as_path(), Some("csv"), BackendOptions::new()).unwrap_err();
    assert!(matches!(err, TwofoldError::ConflictingFormat { inferred, .. } if inferred == "txt"));
    assert_eq!(files_in(&temp_dir), 0);

    // Opting into the permissive policy writes csv under the misleading name
    tabular::save_with(&frame(), path.as_path(), SaveArgs::new().format("csv").allow_conflict(true)).unwrap();
    assert!(fs::read_to_string(&path).unwrap().starts_with("a,b"));
}

#[test]
fn test_conflict_tolerated_on_load() {
    let temp_dir = TempDir::new().unwrap();
    let parquet_path = temp_dir.path().join("data.parquet");
    tabular::save(&frame(), parquet_path.as_path(), None, BackendOptions::new()).unwrap();

    let misnamed = temp_dir.path().join("data.feather");
    fs::rename(&parquet_path, &misnamed).unwrap();

    let loaded = tabular::load(misnamed.as_path(), Some("parquet"), None, BackendOptions::new()).unwrap();
    assert_eq!(loaded.columns(), frame().columns());

    // Trusting the extension reads parquet bytes with the feather decoder
    let err = tabular::load(misnamed.as_path(), None, None, BackendOptions::new()).unwrap_err();
    assert!(matches!(err, TwofoldError::Arrow(_)), "got {err:?}");
    assert!(!err.is_resolution_error());
}

#[test]
fn test_strict_load_policy_can_be_requested() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("data.feather");
    tabular::save(&frame(), path.as_path(), None, BackendOptions::new()).unwrap();

    let err = tabular::load_with(path.as_path(), LoadArgs::new().format("csv").allow_conflict(false)).unwrap_err();
    assert!(matches!(err, TwofoldError::ConflictingFormat { .. }));
}

#[test]
fn test_csv_file_read_through_override() {
    let temp_dir = TempDir::new().unwrap();
    let csv_path = temp_dir.path().join("data.csv");
    tabular::save(&frame(), csv_path.as_path(), None, BackendOptions::new()).unwrap();

    let misnamed = temp_dir.path().join("data.feather");
    fs::rename(&csv_path, &misnamed).unwrap();
    let loaded = tabular::load(misnamed.as_path(), Some("csv"), None, BackendOptions::new()).unwrap();
    assert_eq!(loaded.columns(), frame().columns());
}

#[test]
fn test_unresolvable_format() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("data");

    let err = tabular::save(&frame(), path.as_path(), None, BackendOptions::new()).unwrap_err();
    assert!(matches!(err, TwofoldError::FormatUnresolvable));
    assert_eq!(files_in(&temp_dir), 0);

    tabular::save(&frame(), path.as_path(), Some("feather"), BackendOptions::new()).unwrap();
    let loaded = tabular::load(path.as_path(), Some("feather"), None, BackendOptions::new()).unwrap();
    assert_eq!(loaded, frame());

    assert!(matches!(
        tabular::load(path.as_path(), None, None, BackendOptions::new()),
        Err(TwofoldError::FormatUnresolvable)
    ));
}

#[test]
fn test_unsupported_format_names_the_value() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("data.xyz");

    let err = tabular::save(&frame(), path.as_path(), None, BackendOptions::new()).unwrap_err();
    assert!(matches!(&err, TwofoldError::UnsupportedFormat(name) if name == "xyz"));
    assert!(err.to_string().contains("xyz"));
    assert_eq!(files_in(&temp_dir), 0);

    let bare = temp_dir.path().join("data");
    let err = tabular::save(&frame(), bare.as_path(), Some("excel"), BackendOptions::new()).unwrap_err();
    assert!(matches!(err, TwofoldError::UnsupportedFormat(name) if name == "excel"));

    let err = tabular::save(&frame(), bare.as_path(), Some(""), BackendOptions::new()).unwrap_err();
    assert!(matches!(err, TwofoldError::UnsupportedFormat(name) if name.is_empty()));
}

#[test]
fn test_column_translation_for_csv() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("data.csv");
    tabular::save(&frame(), path.as_path(), None, BackendOptions::new()).unwrap();

    let loaded = tabular::load(path.as_path(), None, Some(&["a"]), BackendOptions::new()).unwrap();
    assert_eq!(names(&loaded), vec!["a"]);
    assert_eq!(loaded.column(0), frame().column(0));

    // The native keyword alone still works
    let loaded = tabular::load(
        path.as_path(),
        None,
        None,
        BackendOptions::new().with("usecols", vec!["b"]),
    )
    .unwrap();
    assert_eq!(names(&loaded), vec!["b"]);

    let err = tabular::load(
        path.as_path(),
        None,
        Some(&["a"]),
        BackendOptions::new().with("usecols", vec!["a"]),
    )
    .unwrap_err();
    assert_eq!(err.to_string(), "Cannot specify both `columns` and `usecols`");
}

#[test]
fn test_column_selection_for_binary_formats() {
    let temp_dir = TempDir::new().unwrap();

    for suffix in ["parquet", "feather"] {
        let path = temp_dir.path().join(format!("data.{suffix}"));
        tabular::save(&frame_with_nulls(), path.as_path(), None, BackendOptions::new()).unwrap();

        let loaded = tabular::load(path.as_path(), None, Some(&["name", "id"]), BackendOptions::new()).unwrap();
        assert_eq!(names(&loaded), vec!["id", "name"], "format {suffix}");

        let err = tabular::load(
            path.as_path(),
            None,
            Some(&["id"]),
            BackendOptions::new().with("columns", vec!["id"]),
        )
        .unwrap_err();
        assert!(matches!(err, TwofoldError::ConflictingOptions { native: "columns", .. }));
    }
}

#[test]
fn test_backend_options_are_forwarded() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("data.csv");

    tabular::save(&frame(), path.as_path(), None, BackendOptions::new().with("delimiter", ";")).unwrap();
    assert!(fs::read_to_string(&path).unwrap().starts_with("a;b"));

    let loaded = tabular::load(path.as_path(), None, None, BackendOptions::new().with("delimiter", ";")).unwrap();
    assert_eq!(loaded.columns(), frame().columns());

    let err = tabular::save(&frame(), path.as_path(), None, BackendOptions::new().with("engine", "fast")).unwrap_err();
    assert!(matches!(err, TwofoldError::InvalidOption { backend: "csv", .. }));
}

#[test]
fn test_memory_paths_and_storage_options() {
    let uri = "memory://dispatch-tests/frame.parquet";
    tabular::save(&frame(), uri, None, BackendOptions::new()).unwrap();
    let loaded = tabular::load(uri, None, None, BackendOptions::new()).unwrap();
    assert_eq!(loaded.columns(), frame().columns());

    // storage_options relocate a relative local path under a base directory
    let temp_dir = TempDir::new().unwrap();
    let options = BackendOptions::new().with(
        "storage_options",
        json!({"base_path": temp_dir.path().to_string_lossy()}),
    );
    tabular::save(&frame(), "nested/frame.feather", None, options.clone()).unwrap();
    assert!(temp_dir.path().join("nested/frame.feather").exists());
    let loaded = tabular::load("nested/frame.feather", None, None, options).unwrap();
    assert_eq!(loaded, frame());

    FilePath::parse(uri).unwrap().delete().unwrap();
}

#[test]
fn test_missing_file_passes_backend_error_through() {
    let temp_dir = TempDir::new().unwrap();
    for suffix in ["csv", "parquet", "feather"] {
        let path = temp_dir.path().join(format!("absent.{suffix}"));
        let err = tabular::load(path.as_path(), None, None, BackendOptions::new()).unwrap_err();
        match err {
            TwofoldError::Io(io) => assert_eq!(io.kind(), std::io::ErrorKind::NotFound),
            other => panic!("Expected Io error for {suffix}, got {other:?}"),
        }
    }
}

#[test]
fn test_dataframe_io_codec() {
    use twofold_core::{DataFrameIo, Persist};

    let temp_dir = TempDir::new().unwrap();
    let path = FilePath::local(temp_dir.path().join("data.parquet"));

    DataFrameIo.save(&frame(), &path, SaveArgs::default()).unwrap();
    let loaded = DataFrameIo.load(&path, LoadArgs::new().columns(["b"])).unwrap();
    assert_eq!(names(&loaded), vec!["b"]);
}

#[test]
fn test_explicit_format_is_case_insensitive() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("data.csv");

    tabular::save(&frame(), path.as_path(), Some(" CSV "), BackendOptions::new()).unwrap();
    let loaded = tabular::load(path.as_path(), Some("Csv"), None, BackendOptions::new()).unwrap();
    assert_eq!(loaded.columns(), frame().columns());
}

#[cfg(unix)]
#[test]
fn test_saved_files_respect_default_mode() {
    use std::os::unix::fs::PermissionsExt;

    let temp_dir = TempDir::new().unwrap();
    let reference = temp_dir.path().join("reference.bin");
    fs::write(&reference, b"x").unwrap();
    let mode = |p: &std::path::Path| fs::metadata(p).unwrap().permissions().mode() & 0o777;

    for format in Format::ALL {
        let path = temp_dir.path().join(format!("data.{format}"));
        tabular::save(&frame(), path.as_path(), None, BackendOptions::new()).unwrap();
        assert_eq!(mode(&path), mode(&reference), "format {format}");
    }
}
