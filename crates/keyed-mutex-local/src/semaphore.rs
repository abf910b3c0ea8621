//! Named POSIX semaphore mutex.

use std::ffi::CString;
use std::io;
use std::sync::Arc;

use keyed_mutex_core::error::{LockError, LockResult};
use keyed_mutex_core::traits::{DistributedMutex, LockHandle};
use tracing::{Span, debug, field, instrument, warn};

use crate::name::semaphore_name;

/// A mutex backed by a named POSIX semaphore with one permit.
///
/// Acquisition blocks until the permit is available; there is no timeout.
/// Only processes on the same host using the same key are coordinated.
///
/// # Crash behavior
///
/// The OS does **not** return the permit if the holding process dies. A
/// crashed holder leaves the key locked until someone calls
/// [`SemaphoreMutex::unlink`] (or the host reboots). Prefer
/// [`FileMutex`](crate::FileMutex) when holders may crash.
#[derive(Debug, Clone)]
pub struct SemaphoreMutex {
    key: String,
    semaphore: Arc<NamedSemaphore>,
}

impl SemaphoreMutex {
    /// Opens the semaphore for `key`, creating it with one permit if absent.
    pub fn new(key: &str) -> LockResult<Self> {
        let name = semaphore_name(key)?;
        let semaphore = NamedSemaphore::open(&name)?;
        Ok(Self {
            key: key.to_string(),
            semaphore: Arc::new(semaphore),
        })
    }

    /// Returns the OS-level semaphore name.
    pub fn semaphore_name(&self) -> &str {
        self.semaphore.name()
    }

    /// Removes the named semaphore for `key` from the system.
    ///
    /// Handles that are already open keep working; later opens create a
    /// fresh semaphore. Returns `false` if no such semaphore existed.
    pub fn unlink(key: &str) -> LockResult<bool> {
        let name = CString::new(semaphore_name(key)?)
            .map_err(|e| LockError::InvalidKey(e.to_string()))?;

        // SAFETY: name is a valid NUL-terminated C string.
        if unsafe { libc::sem_unlink(name.as_ptr()) } == 0 {
            return Ok(true);
        }
        let error = io::Error::last_os_error();
        match error.raw_os_error() {
            Some(libc::ENOENT) => Ok(false),
            _ => Err(LockError::backend(error)),
        }
    }
}

impl DistributedMutex for SemaphoreMutex {
    type Handle = SemaphoreLockHandle;

    fn key(&self) -> &str {
        &self.key
    }

    #[instrument(
        skip(self),
        fields(
            lock.key = %self.key,
            semaphore = %self.semaphore.name(),
            backend = "semaphore",
            elapsed_ms = field::Empty,
        )
    )]
    async fn acquire(&self) -> LockResult<Self::Handle> {
        let start = std::time::Instant::now();
        let semaphore = self.semaphore.clone();

        // A permit taken after the caller gave up is posted back by the handle's drop.
        let handle = tokio::task::spawn_blocking(move || {
            semaphore.wait().map(|()| SemaphoreLockHandle {
                semaphore: Some(semaphore),
            })
        })
        .await
        .map_err(LockError::backend)?
        .map_err(LockError::backend)?;

        Span::current().record("elapsed_ms", start.elapsed().as_millis() as u64);
        debug!("semaphore acquired");

        Ok(handle)
    }
}

/// Handle for a held semaphore permit.
///
/// Dropping the handle posts the permit back.
#[derive(Debug)]
pub struct SemaphoreLockHandle {
    semaphore: Option<Arc<NamedSemaphore>>,
}

impl LockHandle for SemaphoreLockHandle {
    #[instrument(skip(self), fields(backend = "semaphore"))]
    async fn release(mut self) -> LockResult<()> {
        match self.semaphore.take() {
            Some(semaphore) => {
                semaphore.post().map_err(LockError::backend)?;
                debug!(semaphore = %semaphore.name(), "semaphore released");
                Ok(())
            }
            None => Ok(()),
        }
    }
}

impl Drop for SemaphoreLockHandle {
    fn drop(&mut self) {
        if let Some(semaphore) = self.semaphore.take()
            && let Err(error) = semaphore.post()
        {
            warn!(semaphore = %semaphore.name(), %error, "failed to post semaphore on drop");
        }
    }
}

/// Owned `sem_t*` from `sem_open`, closed on drop.
#[derive(Debug)]
struct NamedSemaphore {
    raw: *mut libc::sem_t,
    name: String,
}

// SAFETY: named POSIX semaphores are designed for concurrent use from any
// thread and process; the pointer is only passed to sem_* functions.
unsafe impl Send for NamedSemaphore {}
unsafe impl Sync for NamedSemaphore {}

impl NamedSemaphore {
    const MODE: libc::c_uint = 0o644;
    const INITIAL_PERMITS: libc::c_uint = 1;

    fn open(name: &str) -> LockResult<Self> {
        let c_name = CString::new(name).map_err(|e| LockError::InvalidKey(e.to_string()))?;

        // SAFETY: c_name is a valid NUL-terminated C string; with O_CREAT the
        // variadic mode and value arguments are read as unsigned ints.
        let raw = unsafe {
            libc::sem_open(
                c_name.as_ptr(),
                libc::O_CREAT,
                Self::MODE,
                Self::INITIAL_PERMITS,
            )
        };
        if raw == libc::SEM_FAILED {
            let error = io::Error::last_os_error();
            return Err(LockError::backend(io::Error::new(
                error.kind(),
                format!("sem_open({name}) failed: {error}"),
            )));
        }

        Ok(Self {
            raw,
            name: name.to_string(),
        })
    }

    fn name(&self) -> &str {
        &self.name
    }

    /// Blocks until a permit is taken.
    fn wait(&self) -> io::Result<()> {
        loop {
            // SAFETY: raw came from a successful sem_open and is not yet closed.
            if unsafe { libc::sem_wait(self.raw) } == 0 {
                return Ok(());
            }
            let error = io::Error::last_os_error();
            if error.kind() != io::ErrorKind::Interrupted {
                return Err(error);
            }
        }
    }

    fn post(&self) -> io::Result<()> {
        // SAFETY: raw came from a successful sem_open and is not yet closed.
        if unsafe { libc::sem_post(self.raw) } == 0 {
            Ok(())
        } else {
            Err(io::Error::last_os_error())
        }
    }
}

impl Drop for NamedSemaphore {
    fn drop(&mut self) {
        // SAFETY: raw came from a successful sem_open; this is the only close.
        unsafe {
            libc::sem_close(self.raw);
        }
    }
}
