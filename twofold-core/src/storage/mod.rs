/*!
Storage adapters behind [`crate::FilePath`].

This module defines the storage abstraction (port) and concrete implementations
(adapters). Codecs never talk to a backend directly: they receive a
[`ReadHandle`] or [`WriteHandle`] scoped to a single save or load call.
*/

pub mod local;
#[cfg(feature = "s3")]
pub mod s3;

use crate::{Result, TwofoldError};
use bytes::Bytes;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Cursor, Read, Seek, SeekFrom, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;
use tracing::debug;

/// Storage abstraction for saving and loading byte blobs
///
/// Implementations decide how a key maps onto their medium. All adapters must
/// be shareable across threads; the facade itself holds no mutable state.
pub trait StorageAdapter: Send + Sync {
    /// Save data to the specified location, replacing any previous content
    fn save(&self, data: &[u8], path: &str) -> Result<()>;

    /// Load data from the specified location
    fn load(&self, path: &str) -> Result<Vec<u8>>;

    /// Check if an object exists at the specified location
    fn exists(&self, path: &str) -> bool;

    /// Delete the object at the specified location
    fn delete(&self, path: &str) -> Result<()>;
}

/// How a [`WriteHandle`] treats existing content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    /// Replace the target
    #[default]
    Write,
    /// Append to the target, creating it if missing
    Append,
}

/// Readable, seekable view of a stored object
#[derive(Debug)]
pub enum ReadHandle {
    File(BufReader<File>),
    Memory(Cursor<Bytes>),
}

impl ReadHandle {
    pub(crate) fn from_bytes(data: impl Into<Bytes>) -> Self {
        Self::Memory(Cursor::new(data.into()))
    }
}

impl Read for ReadHandle {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::File(file) => file.read(buf),
            Self::Memory(cursor) => cursor.read(buf),
        }
    }
}

impl Seek for ReadHandle {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match self {
            Self::File(file) => file.seek(pos),
            Self::Memory(cursor) => cursor.seek(pos),
        }
    }
}

/// Writable handle scoped to a single save call
///
/// Nothing is visible at the target until [`WriteHandle::commit`] succeeds.
/// Dropping an uncommitted handle discards what was written (appends to a
/// local file are the exception: they land in place as they are written).
pub struct WriteHandle {
    sink: Sink,
}

enum Sink {
    Staged {
        file: BufWriter<NamedTempFile>,
        target: PathBuf,
    },
    Append(BufWriter<File>),
    Buffered {
        buffer: Vec<u8>,
        adapter: Arc<dyn StorageAdapter>,
        key: String,
    },
}

impl WriteHandle {
    pub(crate) fn staged(file: NamedTempFile, target: PathBuf) -> Self {
        Self {
            sink: Sink::Staged {
                file: BufWriter::new(file),
                target,
            },
        }
    }

    pub(crate) fn append(file: File) -> Self {
        Self {
            sink: Sink::Append(BufWriter::new(file)),
        }
    }

    /// Buffer writes in memory and hand them to `adapter` on commit
    ///
    /// In append mode the current object, if any, seeds the buffer.
    pub fn buffered(adapter: Arc<dyn StorageAdapter>, key: &str, mode: WriteMode) -> Result<Self> {
        let buffer = match mode {
            WriteMode::Append if adapter.exists(key) => adapter.load(key)?,
            _ => Vec::new(),
        };
        Ok(Self {
            sink: Sink::Buffered {
                buffer,
                adapter,
                key: key.to_string(),
            },
        })
    }

    /// Publish everything written so far
    pub fn commit(self) -> Result<()> {
        match self.sink {
            Sink::Staged { file, target } => {
                let staged = file.into_inner().map_err(|e| e.into_error())?;
                staged.persist(&target).map_err(|e| {
                    TwofoldError::storage(format!(
                        "Failed to move staged file into {}: {}",
                        target.display(),
                        e.error
                    ))
                })?;
                debug!(path = %target.display(), "Committed local write");
            }
            Sink::Append(mut file) => {
                file.flush()?;
            }
            Sink::Buffered {
                buffer,
                adapter,
                key,
            } => {
                debug!(key = %key, size = buffer.len(), "Committing buffered write");
                adapter.save(&buffer, &key)?;
            }
        }
        Ok(())
    }
}

impl Write for WriteHandle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match &mut self.sink {
            Sink::Staged { file, .. } => file.write(buf),
            Sink::Append(file) => file.write(buf),
            Sink::Buffered { buffer, .. } => buffer.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.sink {
            Sink::Staged { file, .. } => file.flush(),
            Sink::Append(file) => file.flush(),
            Sink::Buffered { .. } => Ok(()),
        }
    }
}

// Re-export types for convenience
pub use local::LocalFileStorage;
#[cfg(feature = "s3")]
pub use s3::S3StorageAdapter;

static GLOBAL_MEMORY: Lazy<MemoryStorage> = Lazy::new(MemoryStorage::new);

/// Memory-based storage adapter
///
/// Objects live in a shared `HashMap`. Clones share the same map, and
/// [`MemoryStorage::global`] is the store addressed by `memory://` paths.
#[derive(Debug, Clone)]
pub struct MemoryStorage {
    data: Arc<Mutex<HashMap<String, Bytes>>>,
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStorage {
    /// Create an empty, private store
    pub fn new() -> Self {
        Self {
            data: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// The process-wide store behind `memory://` paths
    pub fn global() -> Self {
        GLOBAL_MEMORY.clone()
    }

    /// Fetch an object without copying it
    pub fn get(&self, path: &str) -> Result<Bytes> {
        let storage = self.lock()?;
        storage
            .get(path)
            .cloned()
            .ok_or_else(|| TwofoldError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("memory://{path} not found"),
            )))
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Bytes>>> {
        self.data
            .lock()
            .map_err(|_| TwofoldError::storage("Memory store lock poisoned"))
    }
}

impl StorageAdapter for MemoryStorage {
    fn save(&self, data: &[u8], path: &str) -> Result<()> {
        let mut storage = self.lock()?;
        storage.insert(path.to_string(), Bytes::copy_from_slice(data));
        Ok(())
    }

    fn load(&self, path: &str) -> Result<Vec<u8>> {
        Ok(self.get(path)?.to_vec())
    }

    fn exists(&self, path: &str) -> bool {
        self.lock().map(|s| s.contains_key(path)).unwrap_or(false)
    }

    fn delete(&self, path: &str) -> Result<()> {
        let mut storage = self.lock()?;
        storage.remove(path);
        Ok(())
    }
}
