//! Convenience prelude for keyed mutex types.

pub use crate::clock::{Clock, ManualClock, TokioClock};
pub use crate::double_check::DoubleCheckedLocking;
pub use crate::error::{LockError, LockResult, SynchronizedError};
pub use crate::store::StoreAdapter;
pub use crate::token::Token;
pub use crate::traits::{DistributedMutex, LockHandle, LockProvider, LockProviderExt, MutexExt};
