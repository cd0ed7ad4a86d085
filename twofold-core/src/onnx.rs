/*!
ONNX model interchange files.

An [`OnnxModel`] holds a serialized `ModelProto` exactly as an exporter
produced it. The bytes are stored verbatim; parsing them is left to the
inference runtime that consumes the model.
*/

use crate::protocol::Persist;
use crate::storage::WriteMode;
use crate::{FilePath, IntoFilePath, Result, TwofoldError};
use bytes::Bytes;
use std::io::Write;
use tracing::debug;

/// Serialized ONNX `ModelProto` bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnnxModel(Bytes);

impl OnnxModel {
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Bytes {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

pub fn save(data: &OnnxModel, filepath: impl IntoFilePath) -> Result<()> {
    let filepath = filepath.into_file_path()?;
    debug!(path = %filepath, bytes = data.len(), "Saving ONNX model");
    let mut handle = filepath.create(WriteMode::Write)?;
    handle.write_all(data.as_bytes())?;
    handle.commit()
}

/// Read a model back
///
/// # Errors
/// [`TwofoldError::Validation`] if the file is empty.
pub fn load(filepath: impl IntoFilePath) -> Result<OnnxModel> {
    let filepath = filepath.into_file_path()?;
    let bytes = filepath.read_bytes()?;
    if bytes.is_empty() {
        return Err(TwofoldError::validation(format!(
            "ONNX file {filepath} is empty"
        )));
    }
    Ok(OnnxModel(bytes))
}

/// ONNX codec
#[derive(Debug, Clone, Copy, Default)]
pub struct Onnx;

impl Persist for Onnx {
    type Data = OnnxModel;
    type SaveOptions = ();
    type LoadOptions = ();

    fn save(&self, data: &OnnxModel, filepath: &FilePath, _options: ()) -> Result<()> {
        save(data, filepath)
    }

    fn load(&self, filepath: &FilePath, _options: ()) -> Result<OnnxModel> {
        load(filepath)
    }
}
