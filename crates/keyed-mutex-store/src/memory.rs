//! In-process store adapter with TTL expiry.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use keyed_mutex_core::clock::{Clock, TokioClock};
use keyed_mutex_core::error::{LockError, LockResult};
use keyed_mutex_core::store::StoreAdapter;
use keyed_mutex_core::token::Token;

#[derive(Debug)]
struct Entry {
    value: String,
    expires_at: Instant,
}

#[derive(Debug, Default)]
struct Inner {
    entries: Mutex<HashMap<String, Entry>>,
    unreachable: AtomicBool,
}

/// A key-value store living in this process.
///
/// Entries expire according to the store's [`Clock`]. Clones share the same
/// data, so one `MemoryStore` cloned into several mutexes behaves like one
/// store node; separate `MemoryStore::new()` calls behave like independent
/// nodes.
///
/// [`set_reachable(false)`](MemoryStore::set_reachable) makes every
/// operation fail with `LockError::Adapter`, simulating a partitioned node.
#[derive(Debug, Clone)]
pub struct MemoryStore<C = TokioClock> {
    inner: Arc<Inner>,
    clock: C,
}

impl MemoryStore {
    /// Creates an empty store on the tokio clock.
    pub fn new() -> Self {
        Self::with_clock(TokioClock)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> MemoryStore<C> {
    /// Creates an empty store whose entries expire on `clock`.
    pub fn with_clock(clock: C) -> Self {
        Self {
            inner: Arc::new(Inner::default()),
            clock,
        }
    }

    /// Makes the store reachable or unreachable.
    pub fn set_reachable(&self, reachable: bool) {
        self.inner.unreachable.store(!reachable, Ordering::SeqCst);
    }

    pub fn is_reachable(&self) -> bool {
        !self.inner.unreachable.load(Ordering::SeqCst)
    }

    /// Returns the live value under `key`, ignoring reachability.
    pub fn get(&self, key: &str) -> Option<String> {
        let now = self.clock.now();
        let mut entries = self.entries();
        live_entry(&mut entries, key, now).map(|entry| entry.value.clone())
    }

    /// Writes `value` under `key` unconditionally, ignoring reachability.
    pub fn insert_raw(&self, key: &str, value: &str, ttl: Duration) {
        let expires_at = self.clock.now() + ttl;
        self.entries().insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at,
            },
        );
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries();
        entries.retain(|_, entry| entry.expires_at > now);
        entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.inner
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure_reachable(&self) -> LockResult<()> {
        if self.is_reachable() {
            Ok(())
        } else {
            Err(LockError::adapter(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "memory store is unreachable",
            )))
        }
    }
}

/// Looks up `key`, evicting it first if it has expired.
fn live_entry<'a>(
    entries: &'a mut HashMap<String, Entry>,
    key: &str,
    now: Instant,
) -> Option<&'a Entry> {
    if entries.get(key).is_some_and(|entry| entry.expires_at <= now) {
        entries.remove(key);
    }
    entries.get(key)
}

impl<C: Clock> StoreAdapter for MemoryStore<C> {
    async fn put_if_absent(&self, key: &str, token: &Token, ttl: Duration) -> LockResult<bool> {
        self.ensure_reachable()?;
        let now = self.clock.now();
        let mut entries = self.entries();
        if live_entry(&mut entries, key, now).is_some() {
            return Ok(false);
        }
        entries.insert(
            key.to_string(),
            Entry {
                value: token.as_str().to_string(),
                expires_at: now + ttl,
            },
        );
        Ok(true)
    }

    async fn compare_and_delete(&self, key: &str, expected: &Token) -> LockResult<bool> {
        self.ensure_reachable()?;
        let now = self.clock.now();
        let mut entries = self.entries();
        let owned = live_entry(&mut entries, key, now)
            .is_some_and(|entry| entry.value == expected.as_str());
        if owned {
            entries.remove(key);
        }
        Ok(owned)
    }

    async fn delete(&self, key: &str) -> LockResult<bool> {
        self.ensure_reachable()?;
        let now = self.clock.now();
        let mut entries = self.entries();
        if live_entry(&mut entries, key, now).is_none() {
            return Ok(false);
        }
        Ok(entries.remove(key).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keyed_mutex_core::clock::ManualClock;

    #[tokio::test]
    async fn test_put_if_absent_is_exclusive() {
        let store = MemoryStore::new();
        let first = Token::generate();
        let second = Token::generate();

        assert!(store.put_if_absent("k", &first, Duration::from_secs(5)).await.unwrap());
        assert!(!store.put_if_absent("k", &second, Duration::from_secs(5)).await.unwrap());
        assert_eq!(store.get("k").as_deref(), Some(first.as_str()));
    }

    #[tokio::test]
    async fn test_entries_expire_with_ttl() {
        let clock = ManualClock::new();
        let store = MemoryStore::with_clock(clock.clone());
        let token = Token::generate();

        assert!(store.put_if_absent("k", &token, Duration::from_millis(100)).await.unwrap());
        clock.advance(Duration::from_millis(100));

        assert_eq!(store.get("k"), None);
        let token = Token::generate();
        assert!(
            store
                .put_if_absent("k", &token, Duration::from_millis(100))
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_compare_and_delete_requires_matching_token() {
        let store = MemoryStore::new();
        let owner = Token::generate();
        store.put_if_absent("k", &owner, Duration::from_secs(5)).await.unwrap();

        assert!(!store.compare_and_delete("k", &Token::generate()).await.unwrap());
        assert!(store.get("k").is_some());
        assert!(store.compare_and_delete("k", &owner).await.unwrap());
        assert!(store.get("k").is_none());
    }

    #[tokio::test]
    async fn test_delete_is_unconditional() {
        let store = MemoryStore::new();
        store.insert_raw("k", "someone-else", Duration::from_secs(5));

        assert!(store.delete("k").await.unwrap());
        assert!(!store.delete("k").await.unwrap());
    }

    #[tokio::test]
    async fn test_unreachable_store_fails_every_call() {
        let store = MemoryStore::new();
        store.set_reachable(false);
        let token = Token::generate();

        assert!(matches!(
            store.put_if_absent("k", &token, Duration::from_secs(1)).await,
            Err(LockError::Adapter(_))
        ));
        assert!(matches!(
            store.compare_and_delete("k", &token).await,
            Err(LockError::Adapter(_))
        ));
        assert!(matches!(store.delete("k").await, Err(LockError::Adapter(_))));

        store.set_reachable(true);
        assert!(store.put_if_absent("k", &token, Duration::from_secs(1)).await.unwrap());
    }

    #[tokio::test]
    async fn test_clones_share_entries() {
        let store = MemoryStore::new();
        let clone = store.clone();
        store.insert_raw("k", "v", Duration::from_secs(5));
        assert_eq!(clone.get("k").as_deref(), Some("v"));
        assert_eq!(clone.len(), 1);
    }
}
