//! Mock mutex for testing scoped execution and provider abstraction.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use keyed_mutex::{DistributedMutex, LockError, LockHandle, LockProvider, LockResult};

#[derive(Debug, Default)]
pub struct MockState {
    held: AtomicBool,
    acquires: AtomicUsize,
    releases: AtomicUsize,
    fail_acquire: AtomicBool,
    fail_release: AtomicBool,
}

/// In-memory mutex that records how it was used.
///
/// Acquiring while held fails immediately with a zero-length timeout.
#[derive(Debug, Clone)]
pub struct MockMutex {
    key: String,
    state: Arc<MockState>,
}

impl MockMutex {
    pub fn new(key: &str) -> Self {
        Self {
            key: key.to_string(),
            state: Arc::new(MockState::default()),
        }
    }

    pub fn failing_acquire(self) -> Self {
        self.state.fail_acquire.store(true, Ordering::SeqCst);
        self
    }

    pub fn failing_release(self) -> Self {
        self.state.fail_release.store(true, Ordering::SeqCst);
        self
    }

    pub fn is_held(&self) -> bool {
        self.state.held.load(Ordering::SeqCst)
    }

    pub fn acquires(&self) -> usize {
        self.state.acquires.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> usize {
        self.state.releases.load(Ordering::SeqCst)
    }
}

pub struct MockHandle {
    state: Arc<MockState>,
}

impl LockHandle for MockHandle {
    async fn release(self) -> LockResult<()> {
        self.state.held.store(false, Ordering::SeqCst);
        self.state.releases.fetch_add(1, Ordering::SeqCst);
        if self.state.fail_release.load(Ordering::SeqCst) {
            return Err(LockError::Release {
                failed: 1,
                total: 1,
            });
        }
        Ok(())
    }
}

impl DistributedMutex for MockMutex {
    type Handle = MockHandle;

    fn key(&self) -> &str {
        &self.key
    }

    async fn acquire(&self) -> LockResult<Self::Handle> {
        if self.state.fail_acquire.load(Ordering::SeqCst) {
            return Err(LockError::Timeout(Duration::ZERO));
        }
        if self.state.held.swap(true, Ordering::SeqCst) {
            return Err(LockError::Timeout(Duration::ZERO));
        }
        self.state.acquires.fetch_add(1, Ordering::SeqCst);
        Ok(MockHandle {
            state: Arc::clone(&self.state),
        })
    }
}

/// Provider handing out mock mutexes that share state per key.
#[derive(Debug, Default)]
pub struct MockProvider {
    states: Mutex<HashMap<String, Arc<MockState>>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LockProvider for MockProvider {
    type Mutex = MockMutex;

    fn create_mutex(&self, key: &str) -> LockResult<Self::Mutex> {
        if key.is_empty() {
            return Err(LockError::InvalidKey("lock key cannot be empty".to_string()));
        }
        let mut states = self.states.lock().unwrap();
        let state = states.entry(key.to_string()).or_default();
        Ok(MockMutex {
            key: key.to_string(),
            state: Arc::clone(state),
        })
    }
}
