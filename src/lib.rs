//! Keyed mutual exclusion across processes and hosts.
//!
//! A mutex is identified by a key and serializes a critical section among
//! every process using that key against the same backend:
//!
//! - **File** ([`FileMutex`]): exclusive advisory file lock, single host.
//! - **Semaphore** ([`SemaphoreMutex`], Unix): named POSIX semaphore,
//!   single host. Not released if the holder crashes.
//! - **Spinlock** ([`SpinlockMutex`]): polling `put_if_absent` on one
//!   key-value store with a lease.
//! - **Quorum** ([`QuorumMutex`]): Redlock-style majority over N
//!   independent stores with a drift-adjusted validity window.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use keyed_mutex::*;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let stores = RedisStore::connect_all(&[
//!         "redis://node-a:6379",
//!         "redis://node-b:6379",
//!         "redis://node-c:6379",
//!     ])
//!     .await?;
//!
//!     let options = StoreLockOptions::builder()
//!         .lease(Duration::from_secs(10))
//!         .acquire_timeout(Duration::from_secs(5))
//!         .build()?;
//!
//!     let mutex = Mutex::quorum("nightly-report", stores, options)?;
//!
//!     let rows = mutex
//!         .synchronized(|| async {
//!             // Critical section: only one holder across all hosts.
//!             Ok::<_, std::io::Error>(42)
//!         })
//!         .await?;
//!
//!     println!("processed {rows} rows");
//!     Ok(())
//! }
//! ```
//!
//! # Crate Organization
//!
//! This is a meta-crate that re-exports types from:
//! - `keyed-mutex-core`: traits, errors, clock and token types
//! - `keyed-mutex-local`: file and semaphore mutexes
//! - `keyed-mutex-store`: spinlock and quorum mutexes, store adapters
//!
//! For fine-grained control, you can depend on individual crates instead.

pub mod mutex;

// Re-export core types and traits
pub use keyed_mutex_core::*;

// Re-export single-host backends
#[allow(ambiguous_glob_reexports)]
pub use keyed_mutex_local::*;

// Re-export store-backed backends
#[allow(ambiguous_glob_reexports)]
pub use keyed_mutex_store::*;

pub use mutex::{Mutex, MutexHandle};
