//! Error types for keyed mutex operations.

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while constructing, acquiring, or releasing a mutex.
#[derive(Error, Debug)]
pub enum LockError {
    /// Invalid lease, timeout, or store configuration.
    ///
    /// Raised at construction time and never retried.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// The key cannot be used by the selected backend.
    #[error("invalid lock key: {0}")]
    InvalidKey(String),

    /// Lock acquisition timed out after exhausting the configured budget.
    #[error("lock acquisition timed out after {0:?}")]
    Timeout(Duration),

    /// A single store adapter call failed (network or store error).
    #[error("store adapter error: {0}")]
    Adapter(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Release could not be confirmed on enough stores.
    #[error("failed to release lock on {failed} of {total} store(s)")]
    Release {
        /// Stores where release failed.
        failed: usize,
        /// Stores the release was attempted against.
        total: usize,
    },

    /// OS-level primitive failure (open, flock, semaphore).
    #[error("backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl LockError {
    /// Wraps any error as an adapter failure.
    pub fn adapter(error: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Adapter(error.into())
    }

    /// Wraps any error as an OS primitive failure.
    pub fn backend(error: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Backend(error.into())
    }

    /// Returns `true` if this is a `LockAcquireTimeout`.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

/// Result type for lock operations.
pub type LockResult<T> = Result<T, LockError>;

/// Failure of a `synchronized` call.
///
/// The two variants are never conflated: `Lock` means the critical section
/// did not run, `CriticalSection` carries the section's own error unmodified.
#[derive(Error, Debug)]
pub enum SynchronizedError<E> {
    /// The lock could not be obtained; the critical section never ran.
    #[error(transparent)]
    Lock(#[from] LockError),

    /// The critical section failed. A release failure, if any, rides along.
    #[error("critical section failed: {source}")]
    CriticalSection {
        #[source]
        source: E,
        release_error: Option<LockError>,
    },
}

impl<E> SynchronizedError<E> {
    /// Returns the critical section's error, if that is what failed.
    pub fn into_critical_section(self) -> Option<E> {
        match self {
            Self::CriticalSection { source, .. } => Some(source),
            Self::Lock(_) => None,
        }
    }

    /// Returns the lock error, if acquisition is what failed.
    pub fn lock_error(&self) -> Option<&LockError> {
        match self {
            Self::Lock(e) => Some(e),
            Self::CriticalSection { .. } => None,
        }
    }

    /// Returns `true` if acquisition timed out.
    pub fn is_timeout(&self) -> bool {
        self.lock_error().is_some_and(LockError::is_timeout)
    }
}
