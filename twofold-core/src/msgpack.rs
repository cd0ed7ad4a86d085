//! Object graphs as MessagePack, with struct fields written by name

use crate::protocol::Persist;
use crate::storage::WriteMode;
use crate::{FilePath, IntoFilePath, Result, TwofoldError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;

pub fn save<T: Serialize + ?Sized>(data: &T, filepath: impl IntoFilePath) -> Result<()> {
    let filepath = filepath.into_file_path()?;
    let mut handle = filepath.create(WriteMode::Write)?;
    rmp_serde::encode::write_named(&mut handle, data)
        .map_err(|e| TwofoldError::encode(format!("Failed to encode MessagePack: {e}")))?;
    handle.commit()
}

pub fn load<T: DeserializeOwned>(filepath: impl IntoFilePath) -> Result<T> {
    let filepath = filepath.into_file_path()?;
    rmp_serde::decode::from_read(filepath.open()?)
        .map_err(|e| TwofoldError::encode(format!("Failed to decode MessagePack: {e}")))
}

/// MessagePack codec for values of type `T`
#[derive(Debug)]
pub struct MsgPack<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> MsgPack<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for MsgPack<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Serialize + DeserializeOwned> Persist for MsgPack<T> {
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
