/*!
Tabular save/load with format inference.

[`save`] and [`load`] pick a backend from the path suffix, an explicit
`format`, or both:

```rust,no_run
use twofold_core::{tabular, BackendOptions};
# fn demo(table: &arrow::record_batch::RecordBatch) -> twofold_core::Result<()> {
// Format inferred from the extension
tabular::save(table, "data.csv", None, BackendOptions::new())?;
let table = tabular::load("data.csv", None, None, BackendOptions::new())?;

// No extension: the format must be named
tabular::save(&table, "data", Some("feather"), BackendOptions::new())?;

// Loading a misnamed file: the explicit format wins
let table = tabular::load("mislabeled.txt", Some("parquet"), Some(&["a"]), BackendOptions::new())?;
# let _ = table;
# Ok(())
# }
```

Saving rejects an explicit format that contradicts the extension, so no file
is ever written under a misleading name. Loading lets the explicit format
override the extension. The `columns` argument of [`load`] is renamed to the
backend's own option key (`usecols` for csv). Every resolution error is
raised before storage is touched; backend errors pass through unchanged.
*/

#[cfg(feature = "csv")]
pub mod csv;
#[cfg(feature = "feather")]
pub mod feather;
pub mod format;
#[cfg(feature = "parquet")]
pub mod parquet;
pub mod registry;
pub mod resolver;
#[cfg(feature = "parquet")]
pub mod series;

pub use format::{Format, FormatHint};
pub use registry::{available_formats, backend_for, resolve_adapter, TabularBackend};
pub use resolver::{resolve_format, ConflictPolicy};

#[cfg(feature = "metrics")]
use crate::observability::MetricsTimer;
use crate::options::OptionReader;
use crate::protocol::Persist;
use crate::{BackendOptions, FilePath, IntoFilePath, Result, TwofoldError};
use arrow::compute::concat_batches;
use arrow::datatypes::{Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use tracing::{info, warn};

/// Rows per decoded batch when a backend reads incrementally
pub(crate) const DEFAULT_BATCH_SIZE: usize = 8192;

/// Arguments of [`save_with`]
#[derive(Debug, Clone, PartialEq)]
pub struct SaveArgs {
    pub format: Option<String>,
    pub policy: ConflictPolicy,
    pub options: BackendOptions,
}

impl Default for SaveArgs {
    fn default() -> Self {
        Self {
            format: None,
            policy: ConflictPolicy::Strict,
            options: BackendOptions::new(),
        }
    }
}

impl SaveArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn allow_conflict(mut self, allow: bool) -> Self {
        self.policy = if allow {
            ConflictPolicy::Permissive
        } else {
            ConflictPolicy::Strict
        };
        self
    }

    pub fn options(mut self, options: BackendOptions) -> Self {
        self.options = options;
        self
    }
}

/// Arguments of [`load_with`]
#[derive(Debug, Clone, PartialEq)]
pub struct LoadArgs {
    pub format: Option<String>,
    pub columns: Option<Vec<String>>,
    pub policy: ConflictPolicy,
    pub options: BackendOptions,
}

impl Default for LoadArgs {
    fn default() -> Self {
        Self {
            format: None,
            columns: None,
            policy: ConflictPolicy::Permissive,
            options: BackendOptions::new(),
        }
    }
}

impl LoadArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    pub fn allow_conflict(mut self, allow: bool) -> Self {
        self.policy = if allow {
            ConflictPolicy::Permissive
        } else {
            ConflictPolicy::Strict
        };
        self
    }

    pub fn options(mut self, options: BackendOptions) -> Self {
        self.options = options;
        self
    }
}

/// Save a table, inferring the format from the path unless `format` is given
///
/// Format names and path suffixes are matched case-insensitively after
/// trimming, so `"CSV"` and `data.CSV` both select csv.
///
/// # Errors
/// [`TwofoldError::ConflictingFormat`] when `format` disagrees with the path
/// suffix, [`TwofoldError::FormatUnresolvable`] when neither is available and
/// [`TwofoldError::UnsupportedFormat`] for unknown names. No file is created
/// in any of those cases.
pub fn save(
    data: &RecordBatch,
    filepath: impl IntoFilePath,
    format: Option<&str>,
    options: BackendOptions,
) -> Result<()> {
    let mut args = SaveArgs::new().options(options);
    args.format = format.map(str::to_string);
    save_with(data, filepath, args)
}

/// Load a table, letting an explicit `format` override the path suffix
///
/// `columns` restricts the result to the named columns, returned in file
/// order. `format` is matched case-insensitively, as in [`save`].
///
/// # Errors
/// [`TwofoldError::ConflictingOptions`] when `columns` is given and `options`
/// already holds the backend's column key, plus the resolution errors of
/// [`save`] other than the conflict check.
pub fn load(
    filepath: impl IntoFilePath,
    format: Option<&str>,
    columns: Option<&[&str]>,
    options: BackendOptions,
) -> Result<RecordBatch> {
    let mut args = LoadArgs::new().options(options);
    args.format = format.map(str::to_string);
    args.columns = columns.map(|names| names.iter().map(|name| name.to_string()).collect());
    load_with(filepath, args)
}

/// [`save`] with an explicit conflict policy
pub fn save_with(data: &RecordBatch, filepath: impl IntoFilePath, args: SaveArgs) -> Result<()> {
    let filepath = filepath.into_file_path()?;
    let backend = resolver::resolve_backend(&filepath, args.format.as_deref(), args.policy)
        .inspect_err(|e| warn!(path = %filepath, error = %e, "Rejected tabular save"))?;

    info!(
        path = %filepath,
        format = %backend.format(),
        rows = data.num_rows(),
        columns = data.num_columns(),
        "Saving table"
    );
    instrumented("save", backend.format(), || {
        backend.save(data, &filepath, args.options)
    })
}

/// [`load`] with an explicit conflict policy
pub fn load_with(filepath: impl IntoFilePath, args: LoadArgs) -> Result<RecordBatch> {
    let filepath = filepath.into_file_path()?;
    let backend = resolver::resolve_backend(&filepath, args.format.as_deref(), args.policy)
        .inspect_err(|e| warn!(path = %filepath, error = %e, "Rejected tabular load"))?;
    let columns: Option<Vec<&str>> = args
        .columns
        .as_ref()
        .map(|names| names.iter().map(String::as_str).collect());
    let options = resolver::translate_columns(backend, columns.as_deref(), args.options)
        .inspect_err(|e| warn!(path = %filepath, error = %e, "Rejected tabular load"))?;

    info!(path = %filepath, format = %backend.format(), "Loading table");
    let table = instrumented("load", backend.format(), || backend.load(&filepath, options))?;
    info!(
        path = %filepath,
        rows = table.num_rows(),
        columns = table.num_columns(),
        "Loaded table"
    );
    Ok(table)
}

/// The format-inferring facade as a [`Persist`] codec
#[derive(Debug, Clone, Copy, Default)]
pub struct DataFrameIo;

impl Persist for DataFrameIo {
    type Data = RecordBatch;
    type SaveOptions = SaveArgs;
    type LoadOptions = LoadArgs;

    fn save(&self, data: &RecordBatch, filepath: &FilePath, options: SaveArgs) -> Result<()> {
        save_with(data, filepath, options)
    }

    fn load(&self, filepath: &FilePath, options: LoadArgs) -> Result<RecordBatch> {
        load_with(filepath, options)
    }
}

#[cfg(feature = "metrics")]
fn instrumented<T>(operation: &'static str, format: Format, run: impl FnOnce() -> Result<T>) -> Result<T> {
    let timer = MetricsTimer::start(operation, format.name());
    let result = run();
    match &result {
        Ok(_) => timer.finish(),
        Err(_) => timer.finish_with_error(),
    }
    result
}

#[cfg(not(feature = "metrics"))]
fn instrumented<T>(_operation: &'static str, _format: Format, run: impl FnOnce() -> Result<T>) -> Result<T> {
    run()
}

/// Apply a `storage_options` entry from the bag on top of the path's own
pub(crate) fn with_storage_options(filepath: &FilePath, options: &mut OptionReader) -> Result<FilePath> {
    Ok(match options.take_storage_options()? {
        Some(extra) => filepath.clone().with_storage_options(extra),
        None => filepath.clone(),
    })
}

/// Positions of `names` in `schema`, sorted into file order
pub(crate) fn column_indices(
    backend: &'static str,
    key: &str,
    schema: &Schema,
    names: &[String],
) -> Result<Vec<usize>> {
    if names.is_empty() {
        return Err(TwofoldError::invalid_option(backend, key, "select at least one column"));
    }
    let mut indices = names
        .iter()
        .map(|name| schema.index_of(name))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    indices.sort_unstable();
    indices.dedup();
    Ok(indices)
}

pub(crate) fn collect_batches(schema: SchemaRef, batches: &[RecordBatch]) -> Result<RecordBatch> {
    Ok(concat_batches(&schema, batches)?)
}
