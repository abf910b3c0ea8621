//! Store adapters wrapping `MemoryStore` for fault and timing scenarios.

use std::future::pending;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use keyed_mutex::{LockResult, ManualClock, MemoryStore, StoreAdapter, Token};

/// Counts calls and records every token offered to `put_if_absent`.
#[derive(Debug, Clone)]
pub struct CountingStore<S> {
    inner: S,
    puts: Arc<AtomicUsize>,
    deletes: Arc<AtomicUsize>,
    compare_deletes: Arc<AtomicUsize>,
    tokens: Arc<Mutex<Vec<String>>>,
}

impl<S: StoreAdapter> CountingStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            puts: Arc::default(),
            deletes: Arc::default(),
            compare_deletes: Arc::default(),
            tokens: Arc::default(),
        }
    }

    pub fn puts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub fn deletes(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    pub fn compare_deletes(&self) -> usize {
        self.compare_deletes.load(Ordering::SeqCst)
    }

    pub fn tokens(&self) -> Vec<String> {
        self.tokens.lock().unwrap().clone()
    }
}

impl<S: StoreAdapter> StoreAdapter for CountingStore<S> {
    async fn put_if_absent(&self, key: &str, token: &Token, ttl: Duration) -> LockResult<bool> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.tokens.lock().unwrap().push(token.as_str().to_string());
        self.inner.put_if_absent(key, token, ttl).await
    }

    async fn compare_and_delete(&self, key: &str, expected: &Token) -> LockResult<bool> {
        self.compare_deletes.fetch_add(1, Ordering::SeqCst);
        self.inner.compare_and_delete(key, expected).await
    }

    async fn delete(&self, key: &str) -> LockResult<bool> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.inner.delete(key).await
    }
}

/// Store whose writes take `delay` on a shared [`ManualClock`].
#[derive(Debug, Clone)]
pub struct SlowStore {
    inner: MemoryStore<ManualClock>,
    clock: ManualClock,
    delay: Duration,
}

impl SlowStore {
    pub fn new(clock: &ManualClock, delay: Duration) -> Self {
        Self {
            inner: MemoryStore::with_clock(clock.clone()),
            clock: clock.clone(),
            delay,
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.inner.get(key)
    }
}

impl StoreAdapter for SlowStore {
    async fn put_if_absent(&self, key: &str, token: &Token, ttl: Duration) -> LockResult<bool> {
        let written = self.inner.put_if_absent(key, token, ttl).await;
        self.clock.advance(self.delay);
        written
    }

    async fn compare_and_delete(&self, key: &str, expected: &Token) -> LockResult<bool> {
        self.inner.compare_and_delete(key, expected).await
    }

    async fn delete(&self, key: &str) -> LockResult<bool> {
        self.inner.delete(key).await
    }
}

/// Store that can be made to hang: while stalled, every call waits forever.
#[derive(Debug, Clone, Default)]
pub struct StallingStore {
    inner: MemoryStore,
    stalled: Arc<AtomicBool>,
}

impl StallingStore {
    /// A store that hangs from the start.
    pub fn stalled() -> Self {
        let store = Self::default();
        store.stall(true);
        store
    }

    pub fn stall(&self, stalled: bool) {
        self.stalled.store(stalled, Ordering::SeqCst);
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.inner.get(key)
    }

    async fn wait_if_stalled(&self) {
        if self.stalled.load(Ordering::SeqCst) {
            pending::<()>().await;
        }
    }
}

impl StoreAdapter for StallingStore {
    async fn put_if_absent(&self, key: &str, token: &Token, ttl: Duration) -> LockResult<bool> {
        self.wait_if_stalled().await;
        self.inner.put_if_absent(key, token, ttl).await
    }

    async fn compare_and_delete(&self, key: &str, expected: &Token) -> LockResult<bool> {
        self.wait_if_stalled().await;
        self.inner.compare_and_delete(key, expected).await
    }

    async fn delete(&self, key: &str) -> LockResult<bool> {
        self.wait_if_stalled().await;
        self.inner.delete(key).await
    }
}
