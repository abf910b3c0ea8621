//! Shared fixtures for integration tests.

#![allow(dead_code)]

pub mod mock_mutex;
pub mod stores;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counter incremented with a separate read and write and a yield between
/// them. Without mutual exclusion, concurrent increments get lost.
#[derive(Debug, Clone, Default)]
pub struct RacyCounter(Arc<AtomicU64>);

impl RacyCounter {
    pub async fn increment(&self) {
        let current = self.0.load(Ordering::SeqCst);
        tokio::task::yield_now().await;
        self.0.store(current + 1, Ordering::SeqCst);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

/// Key unique to this process and call site, for backends with global names.
pub fn unique_key(prefix: &str) -> String {
    static NEXT: AtomicU64 = AtomicU64::new(0);
    format!(
        "{prefix}-{}-{}",
        std::process::id(),
        NEXT.fetch_add(1, Ordering::SeqCst)
    )
}

/// Gives spawned drop-release tasks a chance to run.
pub async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}
