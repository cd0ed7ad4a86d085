/*!
Parquet backend built on `parquet`'s arrow reader and writer.

Save options: `compression` (`snappy` default, `zstd`, `none`) and
`row_group_size`. Load options: `columns` (column allowlist) and
`batch_size`. Both accept `storage_options`.
*/

use super::format::Format;
use super::registry::TabularBackend;
use super::{collect_batches, column_indices, with_storage_options, DEFAULT_BATCH_SIZE};
use crate::options::OptionReader;
use crate::protocol::Persist;
use crate::storage::WriteMode;
use crate::{BackendOptions, FilePath, Result, TwofoldError};
use arrow::record_batch::{RecordBatch, RecordBatchReader};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::{ArrowWriter, ProjectionMask};
use parquet::basic::{Compression, ZstdLevel};
use parquet::file::properties::WriterProperties;
use tracing::debug;

const BACKEND: &str = "parquet";

/// Parquet backend
#[derive(Debug, Clone, Copy, Default)]
pub struct ParquetBackend;

fn take_compression(options: &mut OptionReader) -> Result<Compression> {
    match options.take_string("compression")?.as_deref() {
        None | Some("snappy") => Ok(Compression::SNAPPY),
        Some("zstd") => Ok(Compression::ZSTD(ZstdLevel::default())),
        Some("none") | Some("uncompressed") => Ok(Compression::UNCOMPRESSED),
        Some(other) => Err(TwofoldError::invalid_option(
            BACKEND,
            "compression",
            format!("unknown codec '{other}', expected snappy, zstd or none"),
        )),
    }
}

impl Persist for ParquetBackend {
    type Data = RecordBatch;
    type SaveOptions = BackendOptions;
    type LoadOptions = BackendOptions;

    fn save(&self, data: &RecordBatch, filepath: &FilePath, options: BackendOptions) -> Result<()> {
        let mut options = options.reader(BACKEND);
        let compression = take_compression(&mut options)?;
        let row_group_size = options.take_usize("row_group_size")?;
        let filepath = with_storage_options(filepath, &mut options)?;
        options.finish()?;

        let mut properties = WriterProperties::builder().set_compression(compression);
        if let Some(rows) = row_group_size {
            properties = properties.set_max_row_group_size(rows);
        }

        let mut handle = filepath.create(WriteMode::Write)?;
        let mut writer = ArrowWriter::try_new(&mut handle, data.schema(), Some(properties.build()))?;
        writer.write(data)?;
        writer.close()?;
        handle.commit()
    }

    fn load(&self, filepath: &FilePath, options: BackendOptions) -> Result<RecordBatch> {
        let mut options = options.reader(BACKEND);
        let columns = options.take_string_list("columns")?;
        let batch_size = options.take_usize("batch_size")?.unwrap_or(DEFAULT_BATCH_SIZE);
        let filepath = with_storage_options(filepath, &mut options)?;
        options.finish()?;

        let mut builder = ParquetRecordBatchReaderBuilder::try_new(filepath.read_bytes()?)?
            .with_batch_size(batch_size);
        debug!(
            path = %filepath,
            rows = builder.metadata().file_metadata().num_rows(),
            row_groups = builder.metadata().num_row_groups(),
            "Opened parquet file"
        );
        if let Some(names) = columns {
            let indices = column_indices(BACKEND, "columns", builder.schema(), &names)?;
            let mask = ProjectionMask::roots(builder.parquet_schema(), indices);
            builder = builder.with_projection(mask);
        }

        let reader = builder.build()?;
        let schema = reader.schema();
        let batches = reader.collect::<std::result::Result<Vec<_>, _>>()?;
        collect_batches(schema, &batches)
    }
}

impl TabularBackend for ParquetBackend {
    fn format(&self) -> Format {
        Format::Parquet
    }

    fn column_selector(&self) -> &'static str {
        "columns"
    }
}
