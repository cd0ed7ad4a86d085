//! Configuration for storage backend selection and settings
//!
//! A [`StorageConfig`] describes where a [`crate::FilePath`] lives: the local
//! filesystem, the process-wide in-memory store, or an S3 bucket. Paths carry
//! their own configuration, so nothing here is global.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Storage-option key selecting the AWS region.
pub const REGION_KEY: &str = "region";
/// Storage-option key overriding the object-store endpoint.
pub const ENDPOINT_URL_KEY: &str = "endpoint_url";
/// Storage-option key setting the base directory of local paths.
pub const BASE_PATH_KEY: &str = "base_path";

/// Connection options attached to a path, e.g. `{"region": "eu-west-1"}`.
pub type StorageOptions = BTreeMap<String, String>;

/// Enumeration of supported storage backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StorageBackend {
    /// Local filesystem storage
    Local,
    /// Process-wide in-memory object store (`memory://`)
    Memory,
    /// Amazon S3 cloud storage (`s3://`)
    S3,
}

/// Configuration structure for storage backend settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// The storage backend to use
    pub backend: StorageBackend,
    /// S3 bucket name (required for S3 backend)
    pub bucket: Option<String>,
    /// AWS region for S3 operations (optional, defaults to environment)
    pub region: Option<String>,
    /// Custom endpoint for S3-compatible stores
    pub endpoint_url: Option<String>,
    /// Base path for local storage (optional, defaults to current directory)
    pub local_base_path: Option<PathBuf>,
}

impl StorageConfig {
    /// Create a default configuration for local filesystem storage
    pub fn default_local() -> Self {
        StorageConfig {
            backend: StorageBackend::Local,
            bucket: None,
            region: None,
            endpoint_url: None,
            local_base_path: None,
        }
    }

    /// Create a configuration for the in-memory store
    pub fn memory() -> Self {
        StorageConfig {
            backend: StorageBackend::Memory,
            ..Self::default_local()
        }
    }

    /// Create an S3 configuration with specified bucket
    pub fn s3_with_bucket(bucket: String) -> Self {
        StorageConfig {
            backend: StorageBackend::S3,
            bucket: Some(bucket),
            ..Self::default_local()
        }
    }

    /// Parse a storage URI and create appropriate configuration
    ///
    /// Supports formats:
    /// - `s3://bucket-name/path` for S3 storage
    /// - `memory://path` for the in-memory store
    /// - `file:///local/path`, `/local/path` or `./relative/path` for local storage
    ///
    /// Returns the config and the extracted key/path component
    pub fn from_uri(uri: &str) -> Result<(StorageConfig, String), crate::TwofoldError> {
        if let Some(s3_part) = uri.strip_prefix("s3://") {
            let (bucket, key) = match s3_part.split_once('/') {
                Some((bucket, key)) => (bucket, key),
                None => (s3_part, ""),
            };
            if bucket.is_empty() {
                return Err(crate::TwofoldError::validation(
                    "Invalid S3 URI: missing bucket name",
                ));
            }
            Ok((StorageConfig::s3_with_bucket(bucket.to_string()), key.to_string()))
        } else if let Some(key) = uri.strip_prefix("memory://") {
            Ok((StorageConfig::memory(), key.trim_start_matches('/').to_string()))
        } else if let Some(path) = uri.strip_prefix("file://") {
            Ok((StorageConfig::default_local(), path.to_string()))
        } else if let Some((scheme, _)) = uri.split_once("://") {
            Err(crate::TwofoldError::validation(format!(
                "Unsupported storage scheme '{scheme}://'"
            )))
        } else {
            Ok((StorageConfig::default_local(), uri.to_string()))
        }
    }

    /// Fold connection options into the configuration
    ///
    /// Recognised keys are [`REGION_KEY`], [`ENDPOINT_URL_KEY`] and
    /// [`BASE_PATH_KEY`]; other keys are left for the adapter to ignore.
    pub fn apply_storage_options(&mut self, options: &StorageOptions) {
        if let Some(region) = options.get(REGION_KEY) {
            self.region = Some(region.clone());
        }
        if let Some(endpoint) = options.get(ENDPOINT_URL_KEY) {
            self.endpoint_url = Some(endpoint.clone());
        }
        if let Some(base) = options.get(BASE_PATH_KEY) {
            self.local_base_path = Some(PathBuf::from(base));
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> crate::Result<()> {
        match self.backend {
            StorageBackend::S3 => {
                if self.bucket.as_deref().map_or(true, str::is_empty) {
                    return Err(crate::TwofoldError::validation(
                        "S3 backend requires a valid bucket name",
                    ));
                }
            }
            StorageBackend::Local | StorageBackend::Memory => {}
        }
        Ok(())
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::default_local()
    }
}
