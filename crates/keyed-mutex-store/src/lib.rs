//! Store-backed keyed mutexes.
//!
//! - [`SpinlockMutex`]: polls a single store with `put_if_absent` until it
//!   wins or times out; releases with an unconditional `delete`.
//! - [`QuorumMutex`]: Redlock-style acquisition over N independent stores,
//!   held only with a strict majority inside a drift-adjusted validity
//!   window; releases with token-checked `compare_and_delete`.
//!
//! Stores implement [`StoreAdapter`](keyed_mutex_core::StoreAdapter);
//! [`MemoryStore`] and [`RedisStore`] are provided.

pub mod handle;
pub mod lock;
pub mod memory;
pub mod options;
pub mod provider;
pub mod quorum;
pub mod redis;
pub mod spinlock;

pub use handle::QuorumLockHandle;
pub use lock::QuorumMutex;
pub use memory::MemoryStore;
pub use options::{StoreLockOptions, StoreLockOptionsBuilder};
pub use provider::{QuorumLockProvider, SpinlockProvider};
pub use quorum::{ReleaseOutcome, ReleaseReport};
pub use redis::{RedisStore, RedisStoreBuilder};
pub use spinlock::{SpinlockHandle, SpinlockMutex};
