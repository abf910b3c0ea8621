//! File lock provider implementation.

use std::path::{Path, PathBuf};

use keyed_mutex_core::error::{LockError, LockResult};
use keyed_mutex_core::traits::LockProvider;

use crate::file::FileMutex;

/// Builder for file-based lock provider configuration.
pub struct FileLockProviderBuilder {
    directory: Option<PathBuf>,
}

impl FileLockProviderBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self { directory: None }
    }

    /// Sets the directory for lock files.
    ///
    /// The directory will be created if it doesn't exist.
    pub fn directory(mut self, path: impl Into<PathBuf>) -> Self {
        self.directory = Some(path.into());
        self
    }

    /// Builds the provider.
    ///
    /// # Errors
    ///
    /// Returns `LockError::Configuration` if no directory is specified or
    /// if the directory cannot be created.
    pub fn build(self) -> LockResult<FileLockProvider> {
        let directory = self
            .directory
            .ok_or_else(|| LockError::Configuration("lock directory not specified".to_string()))?;

        std::fs::create_dir_all(&directory).map_err(|e| {
            LockError::Configuration(format!(
                "failed to create lock directory '{}': {e}",
                directory.display()
            ))
        })?;

        Ok(FileLockProvider { directory })
    }
}

impl Default for FileLockProviderBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Provider for file-based mutexes sharing one lock directory.
#[derive(Debug, Clone)]
pub struct FileLockProvider {
    directory: PathBuf,
}

impl FileLockProvider {
    /// Returns a new builder for configuring the provider.
    pub fn builder() -> FileLockProviderBuilder {
        FileLockProviderBuilder::new()
    }

    /// Creates a provider using the specified directory.
    pub fn new(directory: impl Into<PathBuf>) -> LockResult<Self> {
        Self::builder().directory(directory).build()
    }

    /// Returns the directory where lock files are stored.
    pub fn directory(&self) -> &Path {
        &self.directory
    }
}

impl LockProvider for FileLockProvider {
    type Mutex = FileMutex;

    fn create_mutex(&self, key: &str) -> LockResult<Self::Mutex> {
        FileMutex::new(&self.directory, key)
    }
}
