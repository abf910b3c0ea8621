//! Quorum lock handle implementation.

use std::sync::Arc;
use std::time::{Duration, Instant};

use keyed_mutex_core::clock::Clock;
use keyed_mutex_core::error::LockResult;
use keyed_mutex_core::store::StoreAdapter;
use keyed_mutex_core::token::Token;
use keyed_mutex_core::traits::LockHandle;
use tracing::{debug, instrument, warn};

use crate::quorum::acquire::QuorumAcquisition;
use crate::quorum::release::{ReleaseOutcome, ReleaseReport, release_quorum};

/// Handle for a held quorum lock.
///
/// Dropping the handle without calling `release` spawns a best-effort
/// release on the current tokio runtime; entries that survive expire with
/// the lease.
pub struct QuorumLockHandle<S: StoreAdapter, C: Clock> {
    key: Arc<str>,
    stores: Arc<Vec<S>>,
    token: Token,
    acquired: Vec<bool>,
    validity: Duration,
    valid_until: Instant,
    adapter_timeout: Duration,
    clock: C,
    released: bool,
}

impl<S: StoreAdapter, C: Clock> QuorumLockHandle<S, C> {
    pub(crate) fn new(
        key: Arc<str>,
        stores: Arc<Vec<S>>,
        acquisition: QuorumAcquisition,
        adapter_timeout: Duration,
        clock: C,
    ) -> Self {
        Self {
            key,
            stores,
            token: acquisition.token,
            acquired: acquisition.acquired,
            validity: acquisition.validity,
            valid_until: acquisition.valid_until,
            adapter_timeout,
            clock,
            released: false,
        }
    }

    /// Validity window computed when the lock was acquired.
    pub fn validity(&self) -> Duration {
        self.validity
    }

    /// Time left in the validity window, zero once it has passed.
    pub fn remaining_validity(&self) -> Duration {
        self.valid_until.saturating_duration_since(self.clock.now())
    }

    /// Number of stores that accepted the token.
    pub fn stores_acquired(&self) -> usize {
        self.acquired.iter().filter(|&&v| v).count()
    }

    /// Per-store acquisition results, indexed by store position.
    pub fn acquired(&self) -> &[bool] {
        &self.acquired
    }

    /// The token this acquisition wrote.
    pub fn token(&self) -> &Token {
        &self.token
    }

    /// Releases the lock on every store and reports each store's outcome.
    #[instrument(
        skip(self),
        fields(lock.key = %self.key, backend = "quorum", stores = self.stores.len())
    )]
    pub async fn release_report(mut self) -> ReleaseReport {
        self.released = true;

        if self.clock.now() > self.valid_until {
            warn!(
                validity_ms = self.validity.as_millis() as u64,
                "released after the validity window; \
                 the critical section may have run without the lock"
            );
        }

        let report =
            release_quorum(&self.key, &self.stores, &self.token, self.adapter_timeout).await;

        for (idx, outcome) in report.outcomes().iter().enumerate() {
            match outcome {
                ReleaseOutcome::Released => {}
                ReleaseOutcome::NotHeld if !self.acquired[idx] => {}
                ReleaseOutcome::NotHeld => {
                    warn!(store = idx, "token no longer present on a store that accepted it");
                }
                ReleaseOutcome::Failed(error) => {
                    warn!(store = idx, %error, "release failed on store; entry will expire");
                }
            }
        }
        debug!(
            released = report.released_count(),
            failed = report.failed_count(),
            "quorum lock released"
        );

        report
    }
}

impl<S: StoreAdapter, C: Clock> LockHandle for QuorumLockHandle<S, C> {
    async fn release(self) -> LockResult<()> {
        self.release_report().await.into_result()
    }
}

impl<S: StoreAdapter, C: Clock> Drop for QuorumLockHandle<S, C> {
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

        let key = Arc::clone(&self.key);
        let stores = Arc::clone(&self.stores);
        let token = self.token.clone();
        let adapter_timeout = self.adapter_timeout;
        runtime.spawn(async move {
            let report = release_quorum(&key, &stores, &token, adapter_timeout).await;
            debug!(
                lock.key = %key,
                released = report.released_count(),
                "released dropped quorum handle"
            );
        });
    }
}
