//! Providers creating store-backed mutexes from shared configuration.

use keyed_mutex_core::clock::{Clock, TokioClock};
use keyed_mutex_core::error::{LockError, LockResult};
use keyed_mutex_core::store::StoreAdapter;
use keyed_mutex_core::traits::LockProvider;

use crate::lock::QuorumMutex;
use crate::options::StoreLockOptions;
use crate::spinlock::SpinlockMutex;

/// Provider for [`SpinlockMutex`]es on one store.
#[derive(Debug, Clone)]
pub struct SpinlockProvider<S, C = TokioClock> {
    store: S,
    options: StoreLockOptions,
    clock: C,
}

impl<S: StoreAdapter + Clone> SpinlockProvider<S> {
    pub fn new(store: S, options: StoreLockOptions) -> Self {
        Self::with_clock(store, options, TokioClock)
    }
}

impl<S: StoreAdapter + Clone, C: Clock> SpinlockProvider<S, C> {
    pub fn with_clock(store: S, options: StoreLockOptions, clock: C) -> Self {
        Self {
            store,
            options,
            clock,
        }
    }
}

impl<S: StoreAdapter + Clone, C: Clock> LockProvider for SpinlockProvider<S, C> {
    type Mutex = SpinlockMutex<S, C>;

    fn create_mutex(&self, key: &str) -> LockResult<Self::Mutex> {
        SpinlockMutex::with_clock(key, self.store.clone(), self.options.clone(), self.clock.clone())
    }
}

/// Provider for [`QuorumMutex`]es over one set of stores.
#[derive(Debug, Clone)]
pub struct QuorumLockProvider<S, C = TokioClock> {
    stores: Vec<S>,
    options: StoreLockOptions,
    clock: C,
}

impl<S: StoreAdapter + Clone> QuorumLockProvider<S> {
    /// Creates a provider over `stores`.
    ///
    /// # Errors
    ///
    /// Returns `LockError::Configuration` if `stores` is empty or the drift
    /// margin is not shorter than the lease.
    pub fn new(stores: impl IntoIterator<Item = S>, options: StoreLockOptions) -> LockResult<Self> {
        Self::with_clock(stores, options, TokioClock)
    }
}

impl<S: StoreAdapter + Clone, C: Clock> QuorumLockProvider<S, C> {
    pub fn with_clock(
        stores: impl IntoIterator<Item = S>,
        options: StoreLockOptions,
        clock: C,
    ) -> LockResult<Self> {
        let stores: Vec<S> = stores.into_iter().collect();
        if stores.is_empty() {
            return Err(LockError::Configuration(
                "quorum provider needs at least one store".to_string(),
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
            stores,
            options,
            clock,
        })
    }

    pub fn stores(&self) -> &[S] {
        &self.stores
    }
}

impl<S: StoreAdapter + Clone, C: Clock> LockProvider for QuorumLockProvider<S, C> {
    type Mutex = QuorumMutex<S, C>;

    fn create_mutex(&self, key: &str) -> LockResult<Self::Mutex> {
        QuorumMutex::with_clock(
            key,
            self.stores.iter().cloned(),
            self.options.clone(),
            self.clock.clone(),
        )
    }
}
