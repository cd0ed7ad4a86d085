/*!
Storage-agnostic file paths.

A [`FilePath`] names one object on the local filesystem, in the in-memory
store, or in an S3 bucket, together with the connection options needed to
reach it. Codecs only use the capabilities defined here: suffix extraction,
scoped read and write handles, and the options bag.
*/

use crate::config::{StorageBackend, StorageConfig, StorageOptions};
use crate::storage::{
    LocalFileStorage, MemoryStorage, ReadHandle, StorageAdapter, WriteHandle, WriteMode,
};
use crate::{Result, TwofoldError};
use bytes::Bytes;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A location a codec can read from or write to
#[derive(Debug, Clone, PartialEq)]
pub struct FilePath {
    config: StorageConfig,
    key: String,
    storage_options: StorageOptions,
}

impl FilePath {
    /// Parse a path or URI (`s3://bucket/key`, `memory://key`, `file:///p`, `p`)
    pub fn parse(uri: &str) -> Result<Self> {
        let (config, key) = StorageConfig::from_uri(uri)?;
        Ok(Self {
            config,
            key,
            storage_options: StorageOptions::new(),
        })
    }

    /// A path on the local filesystem
    pub fn local<P: AsRef<Path>>(path: P) -> Self {
        Self {
            config: StorageConfig::default_local(),
            key: path.as_ref().to_string_lossy().into_owned(),
            storage_options: StorageOptions::new(),
        }
    }

    /// Attach connection options, replacing keys already present
    pub fn with_storage_options<I, K, V>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (key, value) in options {
            self.storage_options.insert(key.into(), value.into());
        }
        self
    }

    /// Connection options attached to this path
    pub fn storage_options(&self) -> &StorageOptions {
        &self.storage_options
    }

    /// The storage backend this path lives on
    pub fn backend(&self) -> StorageBackend {
        self.config.backend
    }

    /// Key or filesystem path within the backend
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Final suffix of the file name including the dot, or `""`
    ///
    /// Only the last suffix counts: `data.tar.gz` yields `".gz"`, and dot
    /// files such as `.env` have no suffix.
    pub fn suffix(&self) -> String {
        Path::new(&self.key)
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .filter(|suffix| suffix.len() > 1)
            .unwrap_or_default()
    }

    /// Open the object for reading
    pub fn open(&self) -> Result<ReadHandle> {
        match self.config.backend {
            StorageBackend::Local => self.local_storage().open_read(&self.key),
            StorageBackend::Memory => Ok(ReadHandle::from_bytes(MemoryStorage::global().get(&self.key)?)),
            StorageBackend::S3 => Ok(ReadHandle::from_bytes(self.adapter()?.load(&self.key)?)),
        }
    }

    /// Read the whole object
    pub fn read_bytes(&self) -> Result<Bytes> {
        match self.config.backend {
            StorageBackend::Memory => MemoryStorage::global().get(&self.key),
            _ => Ok(Bytes::from(self.adapter()?.load(&self.key)?)),
        }
    }

    /// Open the object for writing; see [`WriteHandle`] for the commit rules
    pub fn create(&self, mode: WriteMode) -> Result<WriteHandle> {
        match self.config.backend {
            StorageBackend::Local => self.local_storage().open_write(&self.key, mode),
            _ => WriteHandle::buffered(self.adapter()?, &self.key, mode),
        }
    }

    /// Check whether the object exists
    pub fn exists(&self) -> bool {
        self.adapter().map(|a| a.exists(&self.key)).unwrap_or(false)
    }

    /// Remove the object if present
    pub fn delete(&self) -> Result<()> {
        self.adapter()?.delete(&self.key)
    }

    /// Effective configuration: the parsed location plus storage options
    pub fn config(&self) -> StorageConfig {
        let mut config = self.config.clone();
        config.apply_storage_options(&self.storage_options);
        config
    }

    fn local_storage(&self) -> LocalFileStorage {
        match self.config().local_base_path {
            Some(base) => LocalFileStorage::with_base_dir(base),
            None => LocalFileStorage::new(),
        }
    }

    /// Build the storage adapter serving this path
    pub fn adapter(&self) -> Result<Arc<dyn StorageAdapter>> {
        match self.config.backend {
            StorageBackend::Local => Ok(Arc::new(self.local_storage())),
            StorageBackend::Memory => Ok(Arc::new(MemoryStorage::global())),
            #[cfg(feature = "s3")]
            StorageBackend::S3 => Ok(crate::storage::S3StorageAdapter::shared(&self.config())?),
            #[cfg(not(feature = "s3"))]
            StorageBackend::S3 => Err(TwofoldError::storage(
                "s3:// paths require the `s3` feature",
            )),
        }
    }
}

impl fmt::Display for FilePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.config.backend {
            StorageBackend::Local => write!(f, "{}", self.key),
            StorageBackend::Memory => write!(f, "memory://{}", self.key),
            StorageBackend::S3 => write!(
                f,
                "s3://{}/{}",
                self.config.bucket.as_deref().unwrap_or_default(),
                self.key
            ),
        }
    }
}

/// Conversion into a [`FilePath`], accepted by every `save`/`load` function
pub trait IntoFilePath {
    fn into_file_path(self) -> Result<FilePath>;
}

impl IntoFilePath for FilePath {
    fn into_file_path(self) -> Result<FilePath> {
        Ok(self)
    }
}

impl IntoFilePath for &FilePath {
    fn into_file_path(self) -> Result<FilePath> {
        Ok(self.clone())
    }
}

impl IntoFilePath for &str {
    fn into_file_path(self) -> Result<FilePath> {
        FilePath::parse(self)
    }
}

impl IntoFilePath for String {
    fn into_file_path(self) -> Result<FilePath> {
        FilePath::parse(&self)
    }
}

impl IntoFilePath for &Path {
    fn into_file_path(self) -> Result<FilePath> {
        Ok(FilePath::local(self))
    }
}

impl IntoFilePath for PathBuf {
    fn into_file_path(self) -> Result<FilePath> {
        Ok(FilePath::local(self))
    }
}

impl IntoFilePath for &PathBuf {
    fn into_file_path(self) -> Result<FilePath> {
        Ok(FilePath::local(self))
    }
}
