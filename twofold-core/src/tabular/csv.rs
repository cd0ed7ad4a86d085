/*!
Delimited text backend built on the arrow csv reader and writer.

Save options: `delimiter` (single character, default `,`), `header` (default
`true`). Load options: `delimiter`, `header`, `usecols` (column allowlist),
`batch_size`, `infer_rows` (records scanned to infer the schema, default all).
Both accept `storage_options`.

Types are re-inferred on load. A column holding only nulls has no text to
infer from and comes back as `DataType::Null`.
*/

use super::format::Format;
use super::registry::TabularBackend;
use super::{collect_batches, column_indices, with_storage_options, DEFAULT_BATCH_SIZE};
use crate::protocol::Persist;
use crate::storage::WriteMode;
use crate::{BackendOptions, FilePath, Result};
use arrow::csv::reader::Format as CsvFormat;
use arrow::csv::{ReaderBuilder, WriterBuilder};
use arrow::record_batch::RecordBatch;
use std::io::Seek;
use std::sync::Arc;
use tracing::debug;

const BACKEND: &str = "csv";
const DEFAULT_DELIMITER: u8 = b',';

/// CSV backend
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvBackend;

impl Persist for CsvBackend {
    type Data = RecordBatch;
    type SaveOptions = BackendOptions;
    type LoadOptions = BackendOptions;

    fn save(&self, data: &RecordBatch, filepath: &FilePath, options: BackendOptions) -> Result<()> {
        let mut options = options.reader(BACKEND);
        let delimiter = options.take_byte("delimiter")?.unwrap_or(DEFAULT_DELIMITER);
        let header = options.take_bool("header")?.unwrap_or(true);
        let filepath = with_storage_options(filepath, &mut options)?;
        options.finish()?;

        let mut handle = filepath.create(WriteMode::Write)?;
        let mut writer = WriterBuilder::new()
            .with_header(header)
            .with_delimiter(delimiter)
            .build(&mut handle);
        writer.write(data)?;
        drop(writer);
        handle.commit()
    }

    fn load(&self, filepath: &FilePath, options: BackendOptions) -> Result<RecordBatch> {
        let mut options = options.reader(BACKEND);
        let delimiter = options.take_byte("delimiter")?.unwrap_or(DEFAULT_DELIMITER);
        let header = options.take_bool("header")?.unwrap_or(true);
        let usecols = options.take_string_list("usecols")?;
        let batch_size = options.take_usize("batch_size")?.unwrap_or(DEFAULT_BATCH_SIZE);
        let infer_rows = options.take_usize("infer_rows")?;
        let filepath = with_storage_options(filepath, &mut options)?;
        options.finish()?;

        let mut handle = filepath.open()?;
        let (schema, scanned) = CsvFormat::default()
            .with_header(header)
            .with_delimiter(delimiter)
            .infer_schema(&mut handle, infer_rows)?;
        handle.rewind()?;
        debug!(path = %filepath, fields = schema.fields().len(), scanned, "Inferred csv schema");

        let schema = Arc::new(schema);
        let mut builder = ReaderBuilder::new(schema.clone())
            .with_header(header)
            .with_delimiter(delimiter)
            .with_batch_size(batch_size);
        let output_schema = match usecols {
            Some(names) => {
                let indices = column_indices(BACKEND, "usecols", &schema, &names)?;
                let projected = Arc::new(schema.project(&indices)?);
                builder = builder.with_projection(indices);
                projected
            }
            None => schema,
        };

        let batches = builder.build(handle)?.collect::<std::result::Result<Vec<_>, _>>()?;
        collect_batches(output_schema, &batches)
    }
}

impl TabularBackend for CsvBackend {
    fn format(&self) -> Format {
        Format::Csv
    }

    fn column_selector(&self) -> &'static str {
        "usecols"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TwofoldError;
    use arrow::array::{Array, Float64Array, Int64Array, StringArray};
    use arrow::datatypes::{DataType, Field, Schema};
    use tempfile::TempDir;

    fn sample() -> RecordBatch {
        let schema = Arc::new(Schema::new(vec![
            Field::new("id", DataType::Int64, false),
            Field::new("score", DataType::Float64, false),
            Field::new("label", DataType::Utf8, false),
        ]));
        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(Int64Array::from(vec![1, 2, 3])),
                Arc::new(Float64Array::from(vec![0.5, 1.25, -2.0])),
                Arc::new(StringArray::from(vec!["alpha", "beta", "gamma"])),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_roundtrip_infers_types() {
        let temp_dir = TempDir::new().unwrap();
        let path = FilePath::local(temp_dir.path().join("data.csv"));

        CsvBackend.save(&sample(), &path, BackendOptions::new()).unwrap();
        let loaded = CsvBackend.load(&path, BackendOptions::new()).unwrap();

        assert_eq!(loaded.num_rows(), 3);
        assert_eq!(loaded.schema().field(0).data_type(), &DataType::Int64);
        assert_eq!(loaded.schema().field(1).data_type(), &DataType::Float64);
        assert_eq!(loaded.schema().field(2).data_type(), &DataType::Utf8);
        assert_eq!(loaded.columns(), sample().columns());
    }

    #[test]
    fn test_written_text_has_header_and_no_index() {
        let temp_dir = TempDir::new().unwrap();
        let path = FilePath::local(temp_dir.path().join("data.csv"));
        CsvBackend.save(&sample(), &path, BackendOptions::new()).unwrap();

        let text = std::fs::read_to_string(temp_dir.path().join("data.csv")).unwrap();
        assert_eq!(text.lines().next(), Some("id,score,label"));
        assert_eq!(text.lines().count(), 4);
    }

    #[test]
    fn test_custom_delimiter_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let path = FilePath::local(temp_dir.path().join("data.tsv"));
        let options = BackendOptions::new().with("delimiter", "\t");

        CsvBackend.save(&sample(), &path, options.clone()).unwrap();
        let text = std::fs::read_to_string(temp_dir.path().join("data.tsv")).unwrap();
        assert!(text.starts_with("id\tscore\tlabel"));

        let loaded = CsvBackend.load(&path, options).unwrap();
        assert_eq!(loaded.num_columns(), 3);
    }

    #[test]
    fn test_usecols_returns_file_order() {
        let temp_dir = TempDir::new().unwrap();
        let path = FilePath::local(temp_dir.path().join("data.csv"));
        CsvBackend.save(&sample(), &path, BackendOptions::new()).unwrap();

        let options = BackendOptions::new().with("usecols", vec!["label", "id"]);
        let loaded = CsvBackend.load(&path, options).unwrap();

        let names: Vec<_> = loaded.schema().fields().iter().map(|f| f.name().clone()).collect();
        assert_eq!(names, vec!["id", "label"]);
        let labels = loaded.column(1).as_any().downcast_ref::<StringArray>().unwrap();
        assert_eq!(labels.value(2), "gamma");
        assert_eq!(labels.len(), 3);
    }

    #[test]
    fn test_usecols_unknown_column_fails() {
        let temp_dir = TempDir::new().unwrap();
        let path = FilePath::local(temp_dir.path().join("data.csv"));
        CsvBackend.save(&sample(), &path, BackendOptions::new()).unwrap();

        let options = BackendOptions::new().with("usecols", vec!["missing"]);
        assert!(matches!(CsvBackend.load(&path, options), Err(TwofoldError::Arrow(_))));
    }

    #[test]
    fn test_unknown_option_is_rejected_before_writing() {
        let temp_dir = TempDir::new().unwrap();
        let path = FilePath::local(temp_dir.path().join("data.csv"));

        let err = CsvBackend
            .save(&sample(), &path, BackendOptions::new().with("index", false))
            .unwrap_err();
        assert!(matches!(err, TwofoldError::InvalidOption { backend: "csv", .. }));
        assert!(!path.exists());
    }

    #[test]
    fn test_headerless_file_gets_generated_names() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("raw.csv"), "1,x\n2,y\n").unwrap();
        let path = FilePath::local(temp_dir.path().join("raw.csv"));

        let loaded = CsvBackend
            .load(&path, BackendOptions::new().with("header", false))
            .unwrap();
        assert_eq!(loaded.num_rows(), 2);
        assert_eq!(loaded.num_columns(), 2);
    }

    #[test]
    fn test_small_batches_are_concatenated() {
        let temp_dir = TempDir::new().unwrap();
        let path = FilePath::local(temp_dir.path().join("data.csv"));
        CsvBackend.save(&sample(), &path, BackendOptions::new()).unwrap();

        let loaded = CsvBackend
            .load(&path, BackendOptions::new().with("batch_size", 1))
            .unwrap();
        assert_eq!(loaded.num_rows(), 3);
    }
}
