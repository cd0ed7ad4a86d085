//! Plain UTF-8 text

use crate::protocol::Persist;
use crate::storage::WriteMode;
use crate::{FilePath, IntoFilePath, Result};
use std::io::{Read, Write};
use tracing::debug;

/// Options for [`save`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TextOptions {
    pub mode: WriteMode,
}

impl TextOptions {
    pub fn append() -> Self {
        Self {
            mode: WriteMode::Append,
        }
    }
}

/// Write `data` to `filepath`, replacing or appending per `options.mode`
pub fn save(data: &str, filepath: impl IntoFilePath, options: TextOptions) -> Result<()> {
    let filepath = filepath.into_file_path()?;
    debug!(path = %filepath, bytes = data.len(), mode = ?options.mode, "Saving text");
    let mut handle = filepath.create(options.mode)?;
    handle.write_all(data.as_bytes())?;
    handle.commit()
}

/// Read the whole file as UTF-8
pub fn load(filepath: impl IntoFilePath) -> Result<String> {
    let filepath = filepath.into_file_path()?;
    let mut text = String::new();
    filepath.open()?.read_to_string(&mut text)?;
    Ok(text)
}

/// Text codec
#[derive(Debug, Clone, Copy, Default)]
pub struct Text;

impl Persist for Text {
    type Data = String;
    type SaveOptions = TextOptions;
    type LoadOptions = ();

    fn save(&self, data: &String, filepath: &FilePath, options: TextOptions) -> Result<()> {
        save(data, filepath, options)
    }

    fn load(&self, filepath: &FilePath, _options: ()) -> Result<String> {
        load(filepath)
    }
}
