//! Single-host keyed mutexes.
//!
//! Both variants block until the OS grants the lock and carry no token or
//! lease. They coordinate processes on one host only.
//!
//! - [`FileMutex`]: exclusive advisory lock on a file; released by the OS
//!   if the holder dies.
//! - [`SemaphoreMutex`] (Unix): named POSIX semaphore; **not** released if
//!   the holder dies.

pub mod file;
pub mod name;
pub mod provider;
#[cfg(unix)]
pub mod semaphore;

pub use file::{FileLockHandle, FileMutex};
pub use provider::{FileLockProvider, FileLockProviderBuilder};
#[cfg(unix)]
pub use semaphore::{SemaphoreLockHandle, SemaphoreMutex};
