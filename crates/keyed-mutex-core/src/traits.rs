//! Core traits for keyed mutexes.

use std::future::Future;

use tracing::warn;

use crate::double_check::DoubleCheckedLocking;
use crate::error::{LockResult, SynchronizedError};

// ============================================================================
// Lock Handle Trait
// ============================================================================

/// Handle to a held mutex.
///
/// Call [`release`](LockHandle::release) to give the lock back with error
/// reporting. Every backend also releases (best effort) when a handle is
/// dropped without being released, e.g. on panic or cancellation.
pub trait LockHandle: Send + Sized {
    /// Releases the lock.
    fn release(self) -> impl Future<Output = LockResult<()>> + Send;
}

// ============================================================================
// Distributed Mutex Trait
// ============================================================================

/// Mutual exclusion over a named critical section.
///
/// Implementations coordinate independent processes or hosts that use the
/// same key against the same backend. They do not coordinate callers
/// sharing one instance; each logical caller should own its instance.
///
/// # Example
///
/// ```rust,ignore
/// use keyed_mutex_core::{DistributedMutex, MutexExt};
///
/// let total = mutex
///     .synchronized(|| async {
///         let balance = read_balance().await?;
///         write_balance(balance + 10).await
///     })
///     .await?;
/// ```
pub trait DistributedMutex: Send + Sync {
    /// The handle returned while the lock is held.
    type Handle: LockHandle;

    /// Returns the key identifying the guarded resource.
    fn key(&self) -> &str;

    /// Acquires the lock within the budget fixed at construction.
    ///
    /// # Returns
    ///
    /// * `Ok(handle)` - Lock acquired
    /// * `Err(LockError::Timeout)` - Budget exhausted before the lock was obtained
    /// * `Err(LockError::Backend)` - The local OS primitive failed
    fn acquire(&self) -> impl Future<Output = LockResult<Self::Handle>> + Send;
}

// ============================================================================
// Convenience Extensions
// ============================================================================

/// Scoped execution under a [`DistributedMutex`].
pub trait MutexExt: DistributedMutex {
    /// Runs `critical_section` exactly once while holding the lock.
    ///
    /// Release runs on every exit path. If the section fails, its error is
    /// returned unmodified after release, with any release failure attached.
    /// If only the release fails, the failure is logged and the section's
    /// result is returned.
    fn synchronized<F, Fut, T, E>(
        &self,
        critical_section: F,
    ) -> impl Future<Output = Result<T, SynchronizedError<E>>> + Send
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<T, E>> + Send,
        T: Send,
        E: Send,
    {
        async move {
            let handle = self.acquire().await?;
            let outcome = critical_section().await;
            let released = handle.release().await;

            match (outcome, released) {
                (Ok(value), Ok(())) => Ok(value),
                (Ok(value), Err(error)) => {
                    warn!(
                        lock.key = %self.key(),
                        %error,
                        "release failed after the critical section completed"
                    );
                    Ok(value)
                }
                (Err(source), released) => Err(SynchronizedError::CriticalSection {
                    source,
                    release_error: released.err(),
                }),
            }
        }
    }

    /// Starts a double-checked locking sequence.
    ///
    /// `check` runs once without the lock; only if it holds is the lock
    /// acquired and `check` evaluated again before the section runs.
    ///
    /// ```rust,ignore
    /// let refreshed = mutex
    ///     .check(|| async { cache_is_stale().await })
    ///     .then(|| async { refresh_cache().await })
    ///     .await?;
    /// ```
    fn check<P, PFut>(&self, check: P) -> DoubleCheckedLocking<'_, Self, P>
    where
        Self: Sized,
        P: Fn() -> PFut + Send + Sync,
        PFut: Future<Output = bool> + Send,
    {
        DoubleCheckedLocking::new(self, check)
    }
}

impl<T: DistributedMutex> MutexExt for T {}

// ============================================================================
// Provider Traits
// ============================================================================

/// Factory for mutexes sharing one backend configuration.
///
/// # Example
///
/// ```rust,ignore
/// // Configure once at startup
/// let provider = FileLockProvider::new("/var/run/locks")?;
///
/// // Create mutexes by key anywhere in the application
/// let mutex = provider.create_mutex("nightly-report")?;
/// ```
pub trait LockProvider: Send + Sync {
    /// The mutex type created by this provider.
    type Mutex: DistributedMutex;

    /// Creates a mutex for `key`.
    ///
    /// Fails with `LockError::InvalidKey` if the backend cannot use the key.
    fn create_mutex(&self, key: &str) -> LockResult<Self::Mutex>;
}

/// Extension trait providing convenience methods for lock providers.
pub trait LockProviderExt: LockProvider {
    /// Creates a mutex for `key` and runs `critical_section` under it.
    fn synchronized_on<F, Fut, T, E>(
        &self,
        key: &str,
        critical_section: F,
    ) -> impl Future<Output = Result<T, SynchronizedError<E>>> + Send
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<T, E>> + Send,
        T: Send,
        E: Send,
    {
        let mutex = self.create_mutex(key);
        async move { mutex?.synchronized(critical_section).await }
    }
}

// Blanket implementation for all LockProviders
impl<T: LockProvider> LockProviderExt for T {}
