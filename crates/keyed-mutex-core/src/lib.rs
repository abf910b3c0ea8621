//! Core traits and types for keyed mutexes.

pub mod clock;
pub mod double_check;
pub mod error;
pub mod prelude;
pub mod store;
pub mod timeout;
pub mod token;
pub mod traits;

pub use error::{LockError, LockResult, SynchronizedError};
pub use prelude::*;
