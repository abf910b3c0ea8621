//! Quorum mutex over N independent stores.

use std::sync::Arc;

use keyed_mutex_core::clock::{Clock, TokioClock};
use keyed_mutex_core::error::{LockError, LockResult};
use keyed_mutex_core::store::StoreAdapter;
use keyed_mutex_core::traits::DistributedMutex;
use tracing::{Span, field, instrument};

use crate::handle::QuorumLockHandle;
use crate::options::StoreLockOptions;
use crate::quorum::acquire::acquire_quorum;
use crate::quorum::helper::QuorumHelper;

/// A mutex held when a majority of independent stores agree.
///
/// Tolerates `N - (N/2 + 1)` unreachable stores. Acquisition only succeeds
/// if the majority was reached while the lease, minus the round's duration
/// and the drift margin, is still positive.
pub struct QuorumMutex<S, C = TokioClock> {
    key: Arc<str>,
    stores: Arc<Vec<S>>,
    options: StoreLockOptions,
    clock: C,
}

impl<S: StoreAdapter> QuorumMutex<S> {
    /// Creates a quorum mutex for `key` over `stores`.
    ///
    /// # Errors
    ///
    /// * `LockError::InvalidKey` - `key` is empty
    /// * `LockError::Configuration` - no stores, or a drift margin not
    ///   shorter than the lease
    pub fn new(
        key: &str,
        stores: impl IntoIterator<Item = S>,
        options: StoreLockOptions,
    ) -> LockResult<Self> {
        Self::with_clock(key, stores, options, TokioClock)
    }
}

impl<S: StoreAdapter, C: Clock> QuorumMutex<S, C> {
    /// Creates a quorum mutex reading time from `clock`.
    pub fn with_clock(
        key: &str,
        stores: impl IntoIterator<Item = S>,
        options: StoreLockOptions,
        clock: C,
    ) -> LockResult<Self> {
        if key.is_empty() {
            return Err(LockError::InvalidKey("lock key cannot be empty".to_string()));
        }
        let stores: Vec<S> = stores.into_iter().collect();
        if stores.is_empty() {
            return Err(LockError::Configuration(
                "quorum mutex needs at least one store".to_string(),
            ));
        }
        if options.drift_margin() >= options.lease() {
            return Err(LockError::Configuration(format!(
                "drift margin {:?} leaves no validity in lease {:?}",
                options.drift_margin(),
                options.lease()
            )));
        }

        Ok(Self {
            key: Arc::from(key),
            stores: Arc::new(stores),
            options,
            clock,
        })
    }

    /// Number of stores in the quorum.
    pub fn store_count(&self) -> usize {
        self.stores.len()
    }

    /// Minimum number of stores that must agree.
    pub fn threshold(&self) -> usize {
        QuorumHelper::threshold(self.stores.len())
    }

    pub fn options(&self) -> &StoreLockOptions {
        &self.options
    }
}

impl<S: StoreAdapter, C: Clock> DistributedMutex for QuorumMutex<S, C> {
    type Handle = QuorumLockHandle<S, C>;

    fn key(&self) -> &str {
        &self.key
    }

    #[instrument(
        skip(self),
        fields(
            lock.key = %self.key,
            backend = "quorum",
            stores = self.stores.len(),
            acquired = field::Empty,
            rounds = field::Empty,
            stores_acquired = field::Empty,
            validity_ms = field::Empty,
            elapsed_ms = field::Empty,
            error = field::Empty,
        )
    )]
    async fn acquire(&self) -> LockResult<Self::Handle> {
        let start = self.clock.now();
        let outcome = acquire_quorum(&self.key, &self.stores, &self.options, &self.clock).await;
        let elapsed = self.clock.now().saturating_duration_since(start);
        Span::current().record("elapsed_ms", elapsed.as_millis() as u64);

        match outcome {
            Ok(acquisition) => {
                let span = Span::current();
                span.record("acquired", true);
                span.record("rounds", acquisition.rounds);
                span.record("stores_acquired", acquisition.success_count());
                span.record("validity_ms", acquisition.validity.as_millis() as u64);

                Ok(QuorumLockHandle::new(
                    Arc::clone(&self.key),
                    Arc::clone(&self.stores),
                    acquisition,
                    self.options.adapter_timeout(),
                    self.clock.clone(),
                ))
            }
            Err(error) => {
                Span::current().record("acquired", false);
                Span::current().record("error", field::display(&error));
                Err(error)
            }
        }
    }
}
