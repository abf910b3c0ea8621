//! Backend selection behind one mutex type.

use std::path::Path;

use keyed_mutex_core::clock::{Clock, TokioClock};
use keyed_mutex_core::error::LockResult;
use keyed_mutex_core::store::StoreAdapter;
use keyed_mutex_core::traits::{DistributedMutex, LockHandle};
use keyed_mutex_local::{FileLockHandle, FileMutex};
#[cfg(unix)]
use keyed_mutex_local::{SemaphoreLockHandle, SemaphoreMutex};
use keyed_mutex_store::{
    QuorumLockHandle, QuorumMutex, RedisStore, SpinlockHandle, SpinlockMutex, StoreLockOptions,
};

/// A keyed mutex whose backend is chosen at construction.
///
/// All variants share the [`DistributedMutex`] contract, so code holding a
/// `Mutex` does not care which backend serializes it.
pub enum Mutex<S = RedisStore, C = TokioClock> {
    /// Advisory file lock (single host).
    File(FileMutex),
    /// Named POSIX semaphore (single host).
    #[cfg(unix)]
    Semaphore(SemaphoreMutex),
    /// Polling lock on one store.
    Spinlock(SpinlockMutex<S, C>),
    /// Majority lock over independent stores.
    Quorum(QuorumMutex<S, C>),
}

impl Mutex {
    /// File lock for `key` in `directory`.
    pub fn file(directory: impl AsRef<Path>, key: &str) -> LockResult<Self> {
        FileMutex::new(directory, key).map(Self::File)
    }

    /// Named semaphore for `key`.
    #[cfg(unix)]
    pub fn semaphore(key: &str) -> LockResult<Self> {
        SemaphoreMutex::new(key).map(Self::Semaphore)
    }
}

impl<S: StoreAdapter> Mutex<S> {
    /// Spinlock for `key` on `store`.
    pub fn spinlock(key: &str, store: S, options: StoreLockOptions) -> LockResult<Self> {
        SpinlockMutex::new(key, store, options).map(Self::Spinlock)
    }

    /// Quorum lock for `key` over `stores`.
    pub fn quorum(
        key: &str,
        stores: impl IntoIterator<Item = S>,
        options: StoreLockOptions,
    ) -> LockResult<Self> {
        QuorumMutex::new(key, stores, options).map(Self::Quorum)
    }
}

impl<S, C> Mutex<S, C> {
    /// Short backend name, as used in log fields.
    pub fn backend(&self) -> &'static str {
        match self {
            Self::File(_) => "file",
            #[cfg(unix)]
            Self::Semaphore(_) => "semaphore",
            Self::Spinlock(_) => "spinlock",
            Self::Quorum(_) => "quorum",
        }
    }
}

impl<S, C> From<FileMutex> for Mutex<S, C> {
    fn from(mutex: FileMutex) -> Self {
        Self::File(mutex)
    }
}

#[cfg(unix)]
impl<S, C> From<SemaphoreMutex> for Mutex<S, C> {
    fn from(mutex: SemaphoreMutex) -> Self {
        Self::Semaphore(mutex)
    }
}

impl<S, C> From<SpinlockMutex<S, C>> for Mutex<S, C> {
    fn from(mutex: SpinlockMutex<S, C>) -> Self {
        Self::Spinlock(mutex)
    }
}

impl<S, C> From<QuorumMutex<S, C>> for Mutex<S, C> {
    fn from(mutex: QuorumMutex<S, C>) -> Self {
        Self::Quorum(mutex)
    }
}

/// Handle returned by [`Mutex::acquire`](DistributedMutex::acquire).
pub enum MutexHandle<S: StoreAdapter, C: Clock> {
    File(FileLockHandle),
    #[cfg(unix)]
    Semaphore(SemaphoreLockHandle),
    Spinlock(SpinlockHandle<S, C>),
    Quorum(QuorumLockHandle<S, C>),
}

impl<S: StoreAdapter, C: Clock> LockHandle for MutexHandle<S, C> {
    async fn release(self) -> LockResult<()> {
        match self {
            Self::File(handle) => handle.release().await,
            #[cfg(unix)]
            Self::Semaphore(handle) => handle.release().await,
            Self::Spinlock(handle) => handle.release().await,
            Self::Quorum(handle) => handle.release().await,
        }
    }
}

impl<S: StoreAdapter, C: Clock> DistributedMutex for Mutex<S, C> {
    type Handle = MutexHandle<S, C>;

    fn key(&self) -> &str {
        match self {
            Self::File(mutex) => mutex.key(),
            #[cfg(unix)]
            Self::Semaphore(mutex) => mutex.key(),
            Self::Spinlock(mutex) => mutex.key(),
            Self::Quorum(mutex) => mutex.key(),
        }
    }

    async fn acquire(&self) -> LockResult<Self::Handle> {
        match self {
            Self::File(mutex) => mutex.acquire().await.map(MutexHandle::File),
            #[cfg(unix)]
            Self::Semaphore(mutex) => mutex.acquire().await.map(MutexHandle::Semaphore),
            Self::Spinlock(mutex) => mutex.acquire().await.map(MutexHandle::Spinlock),
            Self::Quorum(mutex) => mutex.acquire().await.map(MutexHandle::Quorum),
        }
    }
}
