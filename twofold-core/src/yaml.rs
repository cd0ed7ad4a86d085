//! YAML documents for any `serde` value

use crate::protocol::Persist;
use crate::storage::WriteMode;
use crate::{FilePath, IntoFilePath, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;

/// Options for [`save`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct YamlOptions {
    pub mode: WriteMode,
}

pub fn save<T: Serialize + ?Sized>(data: &T, filepath: impl IntoFilePath, options: YamlOptions) -> Result<()> {
    let filepath = filepath.into_file_path()?;
    let mut handle = filepath.create(options.mode)?;
    serde_yaml::to_writer(&mut handle, data)?;
    handle.commit()
}

pub fn load<T: DeserializeOwned>(filepath: impl IntoFilePath) -> Result<T> {
    let filepath = filepath.into_file_path()?;
    Ok(serde_yaml::from_reader(filepath.open()?)?)
}

/// YAML codec for values of type `T`
#[derive(Debug)]
pub struct Yaml<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> Yaml<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for Yaml<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Serialize + DeserializeOwned> Persist for Yaml<T> {
    type Data = T;
    type SaveOptions = YamlOptions;
    type LoadOptions = ();

    fn save(&self, data: &T, filepath: &FilePath, options: YamlOptions) -> Result<()> {
        save(data, filepath, options)
    }

    fn load(&self, filepath: &FilePath, _options: ()) -> Result<T> {
        load(filepath)
    }
}
