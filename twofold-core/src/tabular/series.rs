/*!
Single columns stored as one-column parquet files.

Parquet keeps the column's type and null mask intact, which delimited text
would not. An unnamed series is written under a reserved column name and
comes back unnamed.
*/

use super::parquet::ParquetBackend;
use crate::protocol::Persist;
use crate::{BackendOptions, FilePath, Result, TwofoldError};
use arrow::array::ArrayRef;
use arrow::datatypes::{Field, Schema};
use arrow::record_batch::RecordBatch;
use std::sync::Arc;

/// Column name used on disk for a series without a name
pub const UNNAMED_COLUMN: &str = "__series__";

/// A named or unnamed column of values
#[derive(Debug, Clone)]
pub struct Series {
    pub name: Option<String>,
    pub values: ArrayRef,
}

impl PartialEq for Series {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.values.as_ref() == other.values.as_ref()
    }
}

impl Series {
    pub fn new(name: impl Into<String>, values: ArrayRef) -> Self {
        Self {
            name: Some(name.into()),
            values,
        }
    }

    pub fn unnamed(values: ArrayRef) -> Self {
        Self { name: None, values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn to_batch(&self) -> Result<RecordBatch> {
        let name = self.name.as_deref().unwrap_or(UNNAMED_COLUMN);
        let field = Field::new(name, self.values.data_type().clone(), true);
        Ok(RecordBatch::try_new(
            Arc::new(Schema::new(vec![field])),
            vec![self.values.clone()],
        )?)
    }

    fn from_batch(batch: RecordBatch) -> Result<Self> {
        match batch.num_columns() {
            1 => {
                let name = batch.schema().field(0).name().clone();
                Ok(Self {
                    name: (name != UNNAMED_COLUMN).then_some(name),
                    values: batch.column(0).clone(),
                })
            }
            0 => Err(TwofoldError::validation("No columns loaded")),
            _ => Err(TwofoldError::validation(
                "Loaded data has more than one column; load it as a table instead",
            )),
        }
    }
}

/// Series codec
#[derive(Debug, Clone, Copy, Default)]
pub struct SeriesParquet;

impl Persist for SeriesParquet {
    type Data = Series;
    type SaveOptions = BackendOptions;
    type LoadOptions = BackendOptions;

    fn save(&self, data: &Series, filepath: &FilePath, options: BackendOptions) -> Result<()> {
        save(data, filepath, options)
    }

    fn load(&self, filepath: &FilePath, options: BackendOptions) -> Result<Series> {
        load(filepath, options)
    }
}

/// Save a series; `options` are the parquet backend's save options
pub fn save(data: &Series, filepath: &FilePath, options: BackendOptions) -> Result<()> {
    ParquetBackend.save(&data.to_batch()?, filepath, options)
}

/// Load a series from a parquet file holding exactly one column
pub fn load(filepath: &FilePath, options: BackendOptions) -> Result<Series> {
    Series::from_batch(ParquetBackend.load(filepath, options)?)
}
