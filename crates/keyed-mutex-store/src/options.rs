//! Lease and retry configuration for store-backed mutexes.

use std::time::Duration;

use keyed_mutex_core::error::{LockError, LockResult};

/// Validated lease and retry settings shared by spinlock and quorum mutexes.
///
/// Built with [`StoreLockOptions::builder`]; every instance has already
/// passed validation.
#[derive(Debug, Clone)]
pub struct StoreLockOptions {
    lease: Duration,
    acquire_timeout: Duration,
    retry_interval: Duration,
    drift_margin: Duration,
    adapter_timeout: Duration,
}

impl StoreLockOptions {
    /// Smallest lease stores can express (they count in milliseconds).
    pub const MIN_LEASE: Duration = Duration::from_millis(1);

    /// Returns a new builder with default settings.
    pub fn builder() -> StoreLockOptionsBuilder {
        StoreLockOptionsBuilder::new()
    }

    /// Time after which a store entry self-expires.
    pub fn lease(&self) -> Duration {
        self.lease
    }

    /// Total budget for retrying acquisition.
    pub fn acquire_timeout(&self) -> Duration {
        self.acquire_timeout
    }

    /// Base delay between failed attempts, before jitter.
    pub fn retry_interval(&self) -> Duration {
        self.retry_interval
    }

    /// Deduction from the lease covering clock drift across stores.
    pub fn drift_margin(&self) -> Duration {
        self.drift_margin
    }

    /// Bound on a single store call, capped to the remaining acquire budget.
    pub fn adapter_timeout(&self) -> Duration {
        self.adapter_timeout
    }

    /// Default drift margin: 1% of the lease plus 2ms.
    pub fn default_drift_margin(lease: Duration) -> Duration {
        lease / 100 + Duration::from_millis(2)
    }
}

impl Default for StoreLockOptions {
    fn default() -> Self {
        let lease = StoreLockOptionsBuilder::DEFAULT_LEASE;
        Self {
            lease,
            acquire_timeout: StoreLockOptionsBuilder::DEFAULT_ACQUIRE_TIMEOUT,
            retry_interval: StoreLockOptionsBuilder::DEFAULT_RETRY_INTERVAL,
            drift_margin: Self::default_drift_margin(lease),
            adapter_timeout: lease / 10,
        }
    }
}

/// Builder for [`StoreLockOptions`].
#[derive(Debug, Clone)]
pub struct StoreLockOptionsBuilder {
    lease: Duration,
    acquire_timeout: Duration,
    retry_interval: Duration,
    drift_margin: Option<Duration>,
    adapter_timeout: Option<Duration>,
}

impl StoreLockOptionsBuilder {
    const DEFAULT_LEASE: Duration = Duration::from_secs(30);
    const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);
    const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_millis(100);

    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            lease: Self::DEFAULT_LEASE,
            acquire_timeout: Self::DEFAULT_ACQUIRE_TIMEOUT,
            retry_interval: Self::DEFAULT_RETRY_INTERVAL,
            drift_margin: None,
            adapter_timeout: None,
        }
    }

    /// Sets the lease. Must exceed the critical section's expected duration
    /// plus acquisition overhead.
    pub fn lease(mut self, lease: Duration) -> Self {
        self.lease = lease;
        self
    }

    /// Sets the acquisition budget. Zero means a single attempt.
    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    /// Sets the base delay between failed attempts.
    pub fn retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }

    /// Sets the drift margin used by quorum mutexes.
    ///
    /// Defaults to 1% of the lease plus 2ms.
    pub fn drift_margin(mut self, drift: Duration) -> Self {
        self.drift_margin = Some(drift);
        self
    }

    /// Sets the bound on each store call made while acquiring or releasing.
    ///
    /// Defaults to a tenth of the lease.
    pub fn adapter_timeout(mut self, timeout: Duration) -> Self {
        self.adapter_timeout = Some(timeout);
        self
    }

    /// Validates and builds the options.
    ///
    /// # Errors
    ///
    /// Returns `LockError::Configuration` if the lease is shorter than
    /// [`StoreLockOptions::MIN_LEASE`], or the retry interval or adapter
    /// timeout is zero.
    pub fn build(self) -> LockResult<StoreLockOptions> {
        if self.lease < StoreLockOptions::MIN_LEASE {
            return Err(LockError::Configuration(format!(
                "lease must be at least {:?}, got {:?}",
                StoreLockOptions::MIN_LEASE,
                self.lease
            )));
        }
        if self.retry_interval.is_zero() {
            return Err(LockError::Configuration(
                "retry interval must be positive".to_string(),
            ));
        }

        let adapter_timeout = self
            .adapter_timeout
            .unwrap_or_else(|| (self.lease / 10).max(StoreLockOptions::MIN_LEASE));
        if adapter_timeout.is_zero() {
            return Err(LockError::Configuration(
                "adapter timeout must be positive".to_string(),
            ));
        }

        Ok(StoreLockOptions {
            lease: self.lease,
            acquire_timeout: self.acquire_timeout,
            retry_interval: self.retry_interval,
            drift_margin: self
                .drift_margin
                .unwrap_or_else(|| StoreLockOptions::default_drift_margin(self.lease)),
            adapter_timeout,
        })
    }
}

impl Default for StoreLockOptionsBuilder {
    fn default() -> Self {
        Self::new()
    }
}
