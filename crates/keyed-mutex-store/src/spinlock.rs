//! Spinlock mutex over a single store.

use std::sync::Arc;
use std::time::{Duration, Instant};

use keyed_mutex_core::clock::{Clock, TokioClock};
use keyed_mutex_core::error::{LockError, LockResult};
use keyed_mutex_core::store::StoreAdapter;
use keyed_mutex_core::timeout::{Backoff, Deadline};
use keyed_mutex_core::token::Token;
use keyed_mutex_core::traits::{DistributedMutex, LockHandle};
use tracing::{Span, debug, field, instrument, warn};

use crate::options::StoreLockOptions;

/// A mutex that polls one store with `put_if_absent` until it wins or the
/// acquire timeout is spent.
///
/// Each attempt is bounded by the adapter timeout, capped to what is left of
/// the budget, so a stalled store surfaces as `LockError::Timeout` instead of
/// a hang. An attempt cut short counts as a failed one.
///
/// # Release safety
///
/// Release is an unconditional `delete`, for stores that cannot
/// compare-and-delete atomically. If the critical section outlives the
/// lease and another caller acquires the expired key, this release deletes
/// the other caller's entry. Keep the lease well above the critical
/// section's duration; use [`QuorumMutex`](crate::QuorumMutex) (even with a
/// single store) when token-checked release is required.
pub struct SpinlockMutex<S, C = TokioClock> {
    key: String,
    store: Arc<S>,
    options: StoreLockOptions,
    clock: C,
}

impl<S: StoreAdapter> SpinlockMutex<S> {
    /// Creates a spinlock mutex for `key` on `store`.
    ///
    /// # Errors
    ///
    /// Returns `LockError::InvalidKey` if `key` is empty.
    pub fn new(key: &str, store: S, options: StoreLockOptions) -> LockResult<Self> {
        Self::with_clock(key, store, options, TokioClock)
    }
}

impl<S: StoreAdapter, C: Clock> SpinlockMutex<S, C> {
    /// Creates a spinlock mutex reading time from `clock`.
    pub fn with_clock(
        key: &str,
        store: S,
        options: StoreLockOptions,
        clock: C,
    ) -> LockResult<Self> {
        if key.is_empty() {
            return Err(LockError::InvalidKey("lock key cannot be empty".to_string()));
        }
        Ok(Self {
            key: key.to_string(),
            store: Arc::new(store),
            options,
            clock,
        })
    }

    pub fn options(&self) -> &StoreLockOptions {
        &self.options
    }
}

impl<S: StoreAdapter, C: Clock> DistributedMutex for SpinlockMutex<S, C> {
    type Handle = SpinlockHandle<S, C>;

    fn key(&self) -> &str {
        &self.key
    }

    #[instrument(
        skip(self),
        fields(
            lock.key = %self.key,
            backend = "spinlock",
            acquired = field::Empty,
            attempts = field::Empty,
            elapsed_ms = field::Empty,
        )
    )]
    async fn acquire(&self) -> LockResult<Self::Handle> {
        let lease = self.options.lease();
        let deadline = Deadline::start(self.clock.now(), self.options.acquire_timeout());
        let backoff = Backoff::new(self.options.retry_interval());
        let mut attempts = 0u32;

        loop {
            // Only attempt while elapsed < budget; the first attempt always runs.
            if attempts > 0 && deadline.is_expired(self.clock.now()) {
                let span = Span::current();
                span.record("acquired", false);
                span.record("attempts", attempts);
                return Err(LockError::Timeout(deadline.budget()));
            }

            attempts += 1;
            let token = Token::generate();
            let attempt_start = self.clock.now();
            let bound = deadline.attempt_bound(attempt_start, self.options.adapter_timeout());

            let attempt = self.store.put_if_absent(&self.key, &token, lease);
            match tokio::time::timeout(bound, attempt).await {
                Ok(Ok(true)) => {
                    let elapsed = deadline.elapsed(self.clock.now());
                    let span = Span::current();
                    span.record("acquired", true);
                    span.record("attempts", attempts);
                    span.record("elapsed_ms", elapsed.as_millis() as u64);

                    return Ok(SpinlockHandle {
                        key: self.key.clone(),
                        store: Arc::clone(&self.store),
                        lease,
                        adapter_timeout: self.options.adapter_timeout(),
                        acquired_at: attempt_start,
                        clock: self.clock.clone(),
                        released: false,
                    });
                }
                Ok(Ok(false)) => debug!(attempt = attempts, "lock held elsewhere"),
                Ok(Err(error)) => {
                    debug!(attempt = attempts, %error, "store failed during acquire")
                }
                Err(_) => debug!(
                    attempt = attempts,
                    bound_ms = bound.as_millis() as u64,
                    "store call timed out during acquire"
                ),
            }

            let now = self.clock.now();
            if !deadline.is_expired(now) {
                self.clock.sleep(backoff.next_delay(deadline.remaining(now))).await;
            }
        }
    }
}

/// Handle for a held spinlock.
///
/// Dropping the handle without calling `release` spawns a best-effort
/// delete on the current tokio runtime.
pub struct SpinlockHandle<S: StoreAdapter, C: Clock> {
    key: String,
    store: Arc<S>,
    lease: Duration,
    adapter_timeout: Duration,
    acquired_at: Instant,
    clock: C,
    released: bool,
}

impl<S: StoreAdapter, C: Clock> SpinlockHandle<S, C> {
    /// Time left before the store entry expires, zero once it has.
    pub fn remaining_lease(&self) -> Duration {
        (self.acquired_at + self.lease).saturating_duration_since(self.clock.now())
    }
}

impl<S: StoreAdapter, C: Clock> LockHandle for SpinlockHandle<S, C> {
    #[instrument(skip(self), fields(lock.key = %self.key, backend = "spinlock"))]
    async fn release(mut self) -> LockResult<()> {
        self.released = true;

        let held_for = self.clock.now().saturating_duration_since(self.acquired_at);
        if held_for > self.lease {
            warn!(
                held_ms = held_for.as_millis() as u64,
                lease_ms = self.lease.as_millis() as u64,
                "critical section outlived the lease; it may have run without the lock"
            );
        }

        let deleted = tokio::time::timeout(self.adapter_timeout, self.store.delete(&self.key))
            .await
            .unwrap_or_else(|_| {
                Err(LockError::adapter(format!(
                    "store call timed out after {:?}",
                    self.adapter_timeout
                )))
            });

        match deleted {
            Ok(true) => {
                debug!("spinlock released");
                Ok(())
            }
            Ok(false) => {
                warn!("lock entry was already gone at release");
                Ok(())
            }
            Err(error) => {
                warn!(%error, "failed to delete lock entry; it will expire with the lease");
                Err(LockError::Release {
                    failed: 1,
                    total: 1,
                })
            }
        }
    }
}

impl<S: StoreAdapter, C: Clock> Drop for SpinlockHandle<S, C> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(
                lock.key = %self.key,
                "handle dropped outside a runtime; lock will expire with its lease"
            );
            return;
        };

        let key = std::mem::take(&mut self.key);
        let store = Arc::clone(&self.store);
        let adapter_timeout = self.adapter_timeout;
        runtime.spawn(async move {
            match tokio::time::timeout(adapter_timeout, store.delete(&key)).await {
                Ok(Ok(_)) => {}
                Ok(Err(error)) => {
                    warn!(lock.key = %key, %error, "failed to release dropped spinlock handle");
                }
                Err(_) => warn!(lock.key = %key, "release of dropped spinlock handle timed out"),
            }
        });
    }
}
