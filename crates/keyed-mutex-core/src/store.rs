//! Contract for the key-value stores behind store-backed mutexes.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::error::LockResult;
use crate::token::Token;

/// Atomic operations a single key-value store must offer.
///
/// Every method must be atomic on the store side. Failures to reach or talk
/// to the store are reported as `LockError::Adapter`; strategies decide
/// whether that is fatal.
pub trait StoreAdapter: Send + Sync + 'static {
    /// Stores `token` under `key` with expiry `ttl` iff `key` is absent.
    ///
    /// Returns `true` iff the key did not exist and now holds `token`.
    fn put_if_absent(
        &self,
        key: &str,
        token: &Token,
        ttl: Duration,
    ) -> impl Future<Output = LockResult<bool>> + Send;

    /// Removes `key` iff it currently holds `expected`.
    ///
    /// Returns `true` iff an entry with that exact value was removed.
    fn compare_and_delete(
        &self,
        key: &str,
        expected: &Token,
    ) -> impl Future<Output = LockResult<bool>> + Send;

    /// Removes `key` whatever it holds.
    ///
    /// Returns `true` iff an entry was present and removed.
    fn delete(&self, key: &str) -> impl Future<Output = LockResult<bool>> + Send;
}

impl<S: StoreAdapter> StoreAdapter for Arc<S> {
    fn put_if_absent(
        &self,
        key: &str,
        token: &Token,
        ttl: Duration,
    ) -> impl Future<Output = LockResult<bool>> + Send {
        (**self).put_if_absent(key, token, ttl)
    }

    fn compare_and_delete(
        &self,
        key: &str,
        expected: &Token,
    ) -> impl Future<Output = LockResult<bool>> + Send {
        (**self).compare_and_delete(key, expected)
    }

    fn delete(&self, key: &str) -> impl Future<Output = LockResult<bool>> + Send {
        (**self).delete(key)
    }
}
