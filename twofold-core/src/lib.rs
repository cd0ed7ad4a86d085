/*!
# Twofold Core

One `save`/`load` pair per data kind, over local disk, an in-process store and
S3, with the codec chosen from the file extension where that makes sense.

- [`tabular`]: Arrow record batches as csv, parquet or feather, with format
  inference, conflict detection and column selection
- [`text`], [`json`], [`yaml`]: text documents and `serde` values
- [`pickle`], [`msgpack`]: binary object graphs
- [`npy`]: n-dimensional `ndarray` arrays as NumPy `.npy` files
- [`onnx`]: ML model interchange files

Every codec implements [`Persist`], so `load` always returns the type `save`
accepts.

## Paths

Anything implementing [`IntoFilePath`] is accepted: local paths, `file://`,
`memory://key` (process-wide store) and `s3://bucket/key` (feature `s3`).
Writes only become visible once the codec finished successfully.

## Usage

```rust
use std::sync::Arc;
use arrow::array::{ArrayRef, Int64Array};
use arrow::record_batch::RecordBatch;
use twofold_core::{tabular, BackendOptions, TwofoldError};

let dir = tempfile::tempdir()?;
let path = dir.path().join("data.csv");
let table = RecordBatch::try_from_iter(vec![
    ("a", Arc::new(Int64Array::from(vec![1, 2, 3])) as ArrayRef),
    ("b", Arc::new(Int64Array::from(vec![4, 5, 6])) as ArrayRef),
])?;

tabular::save(&table, path.as_path(), None, BackendOptions::new())?;
let only_a = tabular::load(path.as_path(), None, Some(&["a"]), BackendOptions::new())?;
assert_eq!(only_a.num_columns(), 1);

// A format that contradicts the extension is refused on save
let err = tabular::save(&table, path.as_path(), Some("parquet"), BackendOptions::new()).unwrap_err();
assert!(matches!(err, TwofoldError::ConflictingFormat { .. }));
# Ok::<(), Box<dyn std::error::Error>>(())
```
*/

pub mod config;
pub mod error;
pub mod json;
#[cfg(feature = "msgpack")]
pub mod msgpack;
#[cfg(feature = "npy")]
pub mod npy;
pub mod observability;
#[cfg(feature = "onnx")]
pub mod onnx;
pub mod options;
pub mod path;
pub mod pickle;
pub mod protocol;
pub mod storage;
pub mod tabular;
pub mod text;
#[cfg(feature = "yaml")]
pub mod yaml;


pub use config::{StorageBackend, StorageConfig, StorageOptions};
pub use error::{Result, TwofoldError};
pub use observability::{init_default_observability, init_observability};
pub use options::BackendOptions;
pub use path::{FilePath, IntoFilePath};
pub use protocol::Persist;
pub use storage::{LocalFileStorage, MemoryStorage, StorageAdapter, WriteMode};
#[cfg(feature = "s3")]
pub use storage::S3StorageAdapter;
pub use tabular::{ConflictPolicy, DataFrameIo, Format, LoadArgs, SaveArgs};
