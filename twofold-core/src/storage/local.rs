/*!
Local filesystem storage adapter implementation.
*/

use super::{ReadHandle, StorageAdapter, WriteHandle, WriteMode};
use crate::{Result, TwofoldError};
use std::fs::{self, File, OpenOptions};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Local filesystem storage adapter
///
/// Objects are plain files. Parent directories are created on write, and
/// replacing writes are staged in a temporary file next to the target so a
/// failed save never leaves a truncated file behind.
///
/// # Example
/// ```rust
/// use twofold_core::storage::{LocalFileStorage, StorageAdapter};
///
/// let dir = tempfile::tempdir()?;
/// let storage = LocalFileStorage::with_base_dir(dir.path());
/// storage.save(b"a,b\n1,2\n", "frames/data.csv")?;
/// assert!(storage.exists("frames/data.csv"));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct LocalFileStorage {
    /// Optional base directory for relative paths
    base_dir: Option<PathBuf>,
}

impl LocalFileStorage {
    /// Create a new local file storage adapter without a base directory
    ///
    /// Paths provided to save/load will be used as-is.
    pub fn new() -> Self {
        Self { base_dir: None }
    }

    /// Create a new local file storage adapter with a base directory
    ///
    /// All paths will be resolved relative to the base directory.
    pub fn with_base_dir<P: AsRef<Path>>(base_dir: P) -> Self {
        Self {
            base_dir: Some(base_dir.as_ref().to_path_buf()),
        }
    }

    /// Resolve the full path for a given storage path
    pub fn resolve_path(&self, path: &str) -> PathBuf {
        match &self.base_dir {
            Some(base) => base.join(path),
            None => PathBuf::from(path),
        }
    }

    /// Ensure the parent directory exists, creating it if necessary
    fn ensure_parent_dir(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| {
                    TwofoldError::storage(format!(
                        "Failed to create directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }
        Ok(())
    }

    /// Open a file for reading
    pub fn open_read(&self, path: &str) -> Result<ReadHandle> {
        let full_path = self.resolve_path(path);
        let file = File::open(&full_path)?;
        Ok(ReadHandle::File(BufReader::new(file)))
    }

    /// Open a file for writing
    ///
    /// [`WriteMode::Write`] stages into a temporary file in the target
    /// directory that replaces the target on commit.
    pub fn open_write(&self, path: &str, mode: WriteMode) -> Result<WriteHandle> {
        let full_path = self.resolve_path(path);
        self.ensure_parent_dir(&full_path)?;

        match mode {
            WriteMode::Write => {
                let dir = match full_path.parent() {
                    Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                    _ => PathBuf::from("."),
                };
                let mut builder = tempfile::Builder::new();
                builder.prefix(".twofold-");
                // Same mode a plain create would get, umask applied
                #[cfg(unix)]
                {
                    use std::os::unix::fs::PermissionsExt;
                    builder.permissions(fs::Permissions::from_mode(0o666));
                }
                let staged = builder.tempfile_in(&dir)?;
                // Overwrites keep the target's mode
                if let Ok(existing) = fs::metadata(&full_path) {
                    staged.as_file().set_permissions(existing.permissions())?;
                }
                debug!(path = %full_path.display(), "Staging local write");
                Ok(WriteHandle::staged(staged, full_path))
            }
            WriteMode::Append => {
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&full_path)?;
                Ok(WriteHandle::append(file))
            }
        }
    }
}

impl StorageAdapter for LocalFileStorage {
    fn save(&self, data: &[u8], path: &str) -> Result<()> {
        let full_path = self.resolve_path(path);

        self.ensure_parent_dir(&full_path)?;

        fs::write(&full_path, data).map_err(|e| {
            TwofoldError::storage(format!(
                "Failed to write {}: {}",
                full_path.display(),
                e
            ))
        })
    }

    fn load(&self, path: &str) -> Result<Vec<u8>> {
        let full_path = self.resolve_path(path);
        Ok(fs::read(&full_path)?)
    }

    fn exists(&self, path: &str) -> bool {
        self.resolve_path(path).exists()
    }

    fn delete(&self, path: &str) -> Result<()> {
        let full_path = self.resolve_path(path);

        if full_path.exists() {
            fs::remove_file(&full_path).map_err(|e| {
                TwofoldError::storage(format!(
                    "Failed to delete {}: {}",
                    full_path.display(),
                    e
                ))
            })?;
        }

        Ok(())
    }
}
