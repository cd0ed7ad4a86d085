/*!
Feather backend: the Arrow IPC file format.

Save option: `compression` (`lz4` default, `zstd`, `uncompressed`). Load
option: `columns` (column allowlist). Both accept `storage_options`.
*/

use super::format::Format;
use super::registry::TabularBackend;
use super::{collect_batches, column_indices, with_storage_options};
use crate::protocol::Persist;
use crate::storage::WriteMode;
use crate::{BackendOptions, FilePath, Result, TwofoldError};
use arrow::ipc::reader::FileReader;
use arrow::ipc::writer::{FileWriter, IpcWriteOptions};
use arrow::ipc::CompressionType;
use arrow::record_batch::RecordBatch;

const BACKEND: &str = "feather";

/// Feather (Arrow IPC file) backend
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatherBackend;

impl Persist for FeatherBackend {
    type Data = RecordBatch;
    type SaveOptions = BackendOptions;
    type LoadOptions = BackendOptions;

    fn save(&self, data: &RecordBatch, filepath: &FilePath, options: BackendOptions) -> Result<()> {
        let mut options = options.reader(BACKEND);
        let compression = match options.take_string("compression")?.as_deref() {
            None | Some("lz4") => Some(CompressionType::LZ4_FRAME),
            Some("zstd") => Some(CompressionType::ZSTD),
            Some("uncompressed") | Some("none") => None,
            Some(other) => {
                return Err(TwofoldError::invalid_option(
                    BACKEND,
                    "compression",
                    format!("unknown codec '{other}', expected lz4, zstd or uncompressed"),
                ))
            }
        };
        let filepath = with_storage_options(filepath, &mut options)?;
        options.finish()?;

        let write_options = IpcWriteOptions::default().try_with_compression(compression)?;
        let mut handle = filepath.create(WriteMode::Write)?;
        let mut writer = FileWriter::try_new_with_options(&mut handle, data.schema_ref(), write_options)?;
        writer.write(data)?;
        writer.finish()?;
        drop(writer);
        handle.commit()
    }

    fn load(&self, filepath: &FilePath, options: BackendOptions) -> Result<RecordBatch> {
        let mut options = options.reader(BACKEND);
        let columns = options.take_string_list("columns")?;
        let filepath = with_storage_options(filepath, &mut options)?;
        options.finish()?;

        let mut handle = filepath.open()?;
        let projection = match columns {
            Some(names) => {
                // Footer only; no record batch is decoded here
                let schema = FileReader::try_new(&mut handle, None)?.schema();
                Some(column_indices(BACKEND, "columns", &schema, &names)?)
            }
            None => None,
        };

        let reader = FileReader::try_new(handle, projection)?;
        let schema = reader.schema();
        let batches = reader.collect::<std::result::Result<Vec<_>, _>>()?;
        collect_batches(schema, &batches)
    }
}

impl TabularBackend for FeatherBackend {
    fn format(&self) -> Format {
        Format::Feather
    }

    fn column_selector(&self) -> &'static str {
        "columns"
    }
}
