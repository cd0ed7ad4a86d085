/*!
Error types for the twofold core.
*/

use thiserror::Error;

/// Result type used throughout twofold.
pub type Result<T> = std::result::Result<T, TwofoldError>;

/// Errors raised by format resolution, storage and the codec backends.
#[derive(Error, Debug)]
pub enum TwofoldError {
    /// Neither an explicit format nor a usable path suffix was available
    #[error("File format could not be inferred from the file extension and `format` was not provided")]
    FormatUnresolvable,

    /// The explicit format disagrees with the suffix and the policy forbids it
    #[error("Conflicting format information: inferred '{inferred}' from file extension, but format='{provided}' was specified")]
    ConflictingFormat { inferred: String, provided: String },

    /// The resolved format name is not one of the supported formats
    #[error("Unsupported format '{0}'")]
    UnsupportedFormat(String),

    /// The format is known but its backend was compiled out
    #[error("Backend for format '{format}' is not installed (enable the `{feature}` feature)")]
    BackendUnavailable {
        format: String,
        feature: &'static str,
    },

    /// A logical option and its backend-native spelling were both supplied
    #[error("Cannot specify both `{logical}` and `{native}`")]
    ConflictingOptions {
        logical: &'static str,
        native: &'static str,
    },

    /// A backend rejected one of its options
    #[error("Invalid option `{key}` for {backend} backend: {reason}")]
    InvalidOption {
        backend: &'static str,
        key: String,
        reason: String,
    },

    /// I/O errors during file operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization/deserialization errors
    #[cfg(feature = "yaml")]
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Errors raised by the arrow csv and IPC codecs
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Errors raised by the parquet codec
    #[cfg(feature = "parquet")]
    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// Binary object-graph encoding errors (bincode, msgpack)
    #[error("Encoding error: {0}")]
    Encode(String),

    /// Storage adapter errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),
}

impl TwofoldError {
    /// Create a new storage error
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a new encoding error
    pub fn encode<S: Into<String>>(msg: S) -> Self {
        Self::Encode(msg.into())
    }

    /// Create a new invalid option error
    pub fn invalid_option<K: Into<String>, R: Into<String>>(
        backend: &'static str,
        key: K,
        reason: R,
    ) -> Self {
        Self::InvalidOption {
            backend,
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// True for errors raised while resolving a call, before any I/O happened.
    pub fn is_resolution_error(&self) -> bool {
        matches!(
            self,
            Self::FormatUnresolvable
                | Self::ConflictingFormat { .. }
                | Self::UnsupportedFormat(_)
                | Self::BackendUnavailable { .. }
                | Self::ConflictingOptions { .. }
        )
    }
}
