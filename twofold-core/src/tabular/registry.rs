/*!
The fixed format → backend table.

The table is built once on first use and never mutated. Backends compiled out
through cargo features are simply absent from it, which lets lookups tell an
unknown name apart from a known format whose backend is not installed.
*/

use super::format::Format;
use crate::protocol::Persist;
use crate::{BackendOptions, Result, TwofoldError};
use arrow::record_batch::RecordBatch;
use once_cell::sync::Lazy;
use std::collections::BTreeMap;
use tracing::debug;

/// A tabular codec reachable through the registry
///
/// Every backend shares the same `save`/`load` signature: a [`RecordBatch`]
/// and an opaque [`BackendOptions`] bag that only the backend interprets.
pub trait TabularBackend:
    Persist<Data = RecordBatch, SaveOptions = BackendOptions, LoadOptions = BackendOptions>
    + Send
    + Sync
{
    /// The format this backend reads and writes
    fn format(&self) -> Format;

    /// Option key the backend uses for its column allowlist
    fn column_selector(&self) -> &'static str;
}

static BACKENDS: Lazy<BTreeMap<Format, &'static dyn TabularBackend>> = Lazy::new(|| {
    let mut backends: BTreeMap<Format, &'static dyn TabularBackend> = BTreeMap::new();
    #[cfg(feature = "csv")]
    backends.insert(Format::Csv, &super::csv::CsvBackend);
    #[cfg(feature = "parquet")]
    backends.insert(Format::Parquet, &super::parquet::ParquetBackend);
    #[cfg(feature = "feather")]
    backends.insert(Format::Feather, &super::feather::FeatherBackend);
    debug!(formats = ?backends.keys().collect::<Vec<_>>(), "Initialized tabular backend registry");
    backends
});

/// Look up the backend for a format name
///
/// Unknown names fail with [`TwofoldError::UnsupportedFormat`]; known formats
/// built without their feature fail with [`TwofoldError::BackendUnavailable`].
/// Neither path touches storage.
pub fn resolve_adapter(name: &str) -> Result<&'static dyn TabularBackend> {
    let format: Format = name.parse()?;
    backend_for(format)
}

/// Look up the backend for an already validated format
pub fn backend_for(format: Format) -> Result<&'static dyn TabularBackend> {
    BACKENDS
        .get(&format)
        .copied()
        .ok_or_else(|| TwofoldError::BackendUnavailable {
            format: format.name().to_string(),
            feature: format.feature(),
        })
}

/// Formats whose backends are compiled in
pub fn available_formats() -> Vec<Format> {
    BACKENDS.keys().copied().collect()
}
