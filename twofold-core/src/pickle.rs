/*!
Object graphs in a compact binary encoding.

Values are encoded with `bincode`'s standard configuration, so the bytes are
only meaningful to a reader that decodes the same Rust type.
*/

use crate::protocol::Persist;
use crate::storage::WriteMode;
use crate::{FilePath, IntoFilePath, Result, TwofoldError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;
use tracing::debug;

pub fn save<T: Serialize + ?Sized>(data: &T, filepath: impl IntoFilePath) -> Result<()> {
    let filepath = filepath.into_file_path()?;
    let mut handle = filepath.create(WriteMode::Write)?;
    let written = bincode::serde::encode_into_std_write(data, &mut handle, bincode::config::standard())
        .map_err(|e| TwofoldError::encode(format!("Failed to encode object: {e}")))?;
    debug!(path = %filepath, bytes = written, "Saving encoded object");
    handle.commit()
}

pub fn load<T: DeserializeOwned>(filepath: impl IntoFilePath) -> Result<T> {
    let filepath = filepath.into_file_path()?;
    let mut handle = filepath.open()?;
    bincode::serde::decode_from_std_read(&mut handle, bincode::config::standard())
        .map_err(|e| TwofoldError::encode(format!("Failed to decode object: {e}")))
}

/// Binary object codec for values of type `T`
#[derive(Debug)]
pub struct Pickle<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> Pickle<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for Pickle<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Serialize + DeserializeOwned> Persist for Pickle<T> {
    type Data = T;
    type SaveOptions = ();
    type LoadOptions = ();

    fn save(&self, data: &T, filepath: &FilePath, _options: ()) -> Result<()> {
        save(data, filepath)
    }

    fn load(&self, filepath: &FilePath, _options: ()) -> Result<T> {
        load(filepath)
    }
}
