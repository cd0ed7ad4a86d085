/*!
JSON documents.

Any `serde` value works: untyped maps through [`serde_json::Value`] and typed
models through their `Serialize`/`Deserialize` derives.
*/

use crate::protocol::Persist;
use crate::storage::WriteMode;
use crate::{FilePath, IntoFilePath, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;
use tracing::debug;

/// Options for [`save`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JsonOptions {
    /// Indent the output
    pub pretty: bool,
    pub mode: WriteMode,
}

impl JsonOptions {
    pub fn pretty() -> Self {
        Self {
            pretty: true,
            ..Self::default()
        }
    }
}

pub fn save<T: Serialize + ?Sized>(data: &T, filepath: impl IntoFilePath, options: JsonOptions) -> Result<()> {
    let filepath = filepath.into_file_path()?;
    debug!(path = %filepath, pretty = options.pretty, "Saving json");
    let mut handle = filepath.create(options.mode)?;
    if options.pretty {
        serde_json::to_writer_pretty(&mut handle, data)?;
    } else {
        serde_json::to_writer(&mut handle, data)?;
    }
    handle.commit()
}

pub fn load<T: DeserializeOwned>(filepath: impl IntoFilePath) -> Result<T> {
    let filepath = filepath.into_file_path()?;
    Ok(serde_json::from_reader(filepath.open()?)?)
}

/// JSON codec for values of type `T`
#[derive(Debug)]
pub struct Json<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> Json<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for Json<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Serialize + DeserializeOwned> Persist for Json<T> {
    type Data = T;
    type SaveOptions = JsonOptions;
    type LoadOptions = ();

    fn save(&self, data: &T, filepath: &FilePath, options: JsonOptions) -> Result<()> {
        save(data, filepath, options)
    }

    fn load(&self, filepath: &FilePath, _options: ()) -> Result<T> {
        load(filepath)
    }
}
