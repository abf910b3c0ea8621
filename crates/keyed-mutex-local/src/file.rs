//! Advisory file lock mutex.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fd_lock::RwLock;
use keyed_mutex_core::error::{LockError, LockResult};
use keyed_mutex_core::traits::{DistributedMutex, LockHandle};
use tracing::{Span, debug, field, instrument};

use crate::name::lock_file_path;

/// A mutex backed by an exclusive advisory lock on a file.
///
/// Acquisition blocks until the OS grants the lock; there is no timeout.
/// The OS drops the lock when the holding process exits, so a crashed
/// holder never wedges the key. Only processes on the same host that lock
/// the same path are coordinated.
#[derive(Debug, Clone)]
pub struct FileMutex {
    /// Full path to the lock file.
    path: PathBuf,
    /// Original lock key.
    key: String,
}

impl FileMutex {
    /// Creates a mutex for `key` whose lock file lives in `directory`.
    pub fn new(directory: impl AsRef<Path>, key: &str) -> LockResult<Self> {
        let path = lock_file_path(directory.as_ref(), key)?;
        Ok(Self {
            path,
            key: key.to_string(),
        })
    }

    /// Creates a mutex that locks exactly `path`.
    ///
    /// The key is the file name.
    pub fn from_path(path: impl Into<PathBuf>) -> LockResult<Self> {
        let path = path.into();
        let key = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                LockError::InvalidKey(format!("invalid lock file path: {}", path.display()))
            })?
            .to_string();

        Ok(Self { path, key })
    }

    /// Returns the path of the lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Opens (creating if needed) and exclusively locks `path`, blocking the
/// calling thread until the lock is granted.
///
/// The returned file keeps the lock; closing it unlocks.
fn lock_exclusive(path: &Path) -> LockResult<File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            LockError::backend(std::io::Error::new(
                e.kind(),
                format!("failed to create lock directory '{}': {e}", parent.display()),
            ))
        })?;
    }

    if path.is_dir() {
        return Err(LockError::InvalidKey(format!(
            "lock file '{}' is already the name of a directory",
            path.display()
        )));
    }

    // No truncation: a waiting process must never modify a held lock file.
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .map_err(|e| {
            LockError::backend(std::io::Error::new(
                e.kind(),
                format!("failed to open lock file '{}': {e}", path.display()),
            ))
        })?;

    let mut lock = RwLock::new(file);
    let guard = lock.write().map_err(LockError::backend)?;
    // The guard would unlock on drop; the lock instead lives as long as the descriptor.
    std::mem::forget(guard);
    Ok(lock.into_inner())
}

impl DistributedMutex for FileMutex {
    type Handle = FileLockHandle;

    fn key(&self) -> &str {
        &self.key
    }

    #[instrument(
        skip(self),
        fields(
            lock.key = %self.key,
            lock.path = %self.path.display(),
            backend = "file",
            elapsed_ms = field::Empty,
        )
    )]
    async fn acquire(&self) -> LockResult<Self::Handle> {
        let start = std::time::Instant::now();
        let path = self.path.clone();

        let file = tokio::task::spawn_blocking(move || lock_exclusive(&path))
            .await
            .map_err(LockError::backend)??;

        Span::current().record("elapsed_ms", start.elapsed().as_millis() as u64);
        debug!("file lock acquired");

        Ok(FileLockHandle {
            file,
            path: self.path.clone(),
        })
    }
}

/// Handle for a held file lock.
///
/// Dropping the handle closes the descriptor, which releases the lock. The
/// lock file itself is left in place: deleting it would let a waiter that
/// already opened the old file and a newcomer creating a fresh one both
/// believe they hold the lock.
#[derive(Debug)]
pub struct FileLockHandle {
    file: File,
    path: PathBuf,
}

impl FileLockHandle {
    /// Returns the path of the locked file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LockHandle for FileLockHandle {
    #[instrument(skip(self), fields(lock.path = %self.path.display(), backend = "file"))]
    async fn release(self) -> LockResult<()> {
        drop(self.file);
        debug!("file lock released");
        Ok(())
    }
}
