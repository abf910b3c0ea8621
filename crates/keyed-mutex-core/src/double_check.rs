//! Double-checked locking on top of [`DistributedMutex`].

use std::future::Future;

use tracing::debug;

use crate::error::SynchronizedError;
use crate::traits::{DistributedMutex, MutexExt};

/// Pending double-checked locking sequence, created by [`MutexExt::check`].
pub struct DoubleCheckedLocking<'a, M, P> {
    mutex: &'a M,
    check: P,
}

impl<'a, M, P, PFut> DoubleCheckedLocking<'a, M, P>
where
    M: DistributedMutex,
    P: Fn() -> PFut + Send + Sync,
    PFut: Future<Output = bool> + Send,
{
    pub(crate) fn new(mutex: &'a M, check: P) -> Self {
        Self { mutex, check }
    }

    /// Runs `critical_section` if the check passes both before and after
    /// acquiring the lock.
    ///
    /// Returns `Ok(None)` without running the section when either check
    /// fails. The lock is not acquired at all if the first check fails.
    pub async fn then<F, Fut, T, E>(
        self,
        critical_section: F,
    ) -> Result<Option<T>, SynchronizedError<E>>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<T, E>> + Send,
        T: Send,
        E: Send,
    {
        if !(self.check)().await {
            debug!(lock.key = %self.mutex.key(), "check failed before locking");
            return Ok(None);
        }

        let check = &self.check;
        let key = self.mutex.key();
        self.mutex
            .synchronized(move || async move {
                if !check().await {
                    debug!(lock.key = %key, "check failed under the lock");
                    return Ok(None);
                }
                critical_section().await.map(Some)
            })
            .await
    }
}
