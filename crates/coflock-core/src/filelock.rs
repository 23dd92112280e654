//! Advisory file locking for cooperative schedulers
//!
//! A [`LockHandle`] turns the OS's non-blocking advisory lock into an async
//! operation: probe, and if the lock is held incompatibly, sleep on the
//! runtime's timer and probe again. The scheduler thread is never blocked.
//!
//! # Design Principles
//!
//! - **Zero panics**: All operations return `Result<T, Error>`
//! - **Contention is internal**: "would block" is retried, every other OS
//!   error is returned unchanged on the first occurrence
//! - **Fixed retry interval**: no backoff growth, no jitter, no timeout
//! - **Drop-safe**: [`LockGuard`] releases on every exit path
//!
//! # Caller responsibilities
//!
//! - One handle per open file. Two handles over the same [`Resource`] share
//!   one OS lock and the protocol cannot tell them apart.
//! - Release before dropping the handle. A handle dropped while locked leaves
//!   the OS lock in place until the file itself is closed.

use std::future::Future;

use crate::{
    backend::{classify, Attempt, Flock, LockBackend},
    config::LockOptions,
    error::LockOperation,
    mode::LockMode,
    resource::Resource,
    Error, Result,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LockState {
    Unlocked,
    Locked,
}

/// One lock binding over one borrowed [`Resource`].
///
/// # Examples
///
/// ```no_run
/// use std::io::Write;
///
/// use coflock_core::{LockHandle, Resource};
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() -> Result<(), coflock_core::Error> {
///     let resource = Resource::open_read_write("/tmp/counter.txt")?;
///     let mut lock = LockHandle::exclusive(&resource);
///
///     lock.with_lock(|| async {
///         resource
///             .file()
///             .write_all(b"1")
///             .map_err(|e| coflock_core::Error::io("write counter", e))
///     })
///     .await?;
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct LockHandle<'a, B: LockBackend = Flock> {
    resource: &'a Resource,
    mode: LockMode,
    backend: B,
    options: LockOptions,
    state: LockState,
}

impl<'a> LockHandle<'a, Flock> {
    /// Exclusive handle over any resource. Cannot fail.
    #[must_use]
    pub fn exclusive(resource: &'a Resource) -> Self {
        Self::bind(resource, LockMode::Exclusive, Flock)
    }

    /// Handle in `mode`, validated against the resource's access mode.
    ///
    /// # Errors
    ///
    /// [`Error::BadResourceMode`] for a shared handle over a resource that
    /// was not opened read-only.
    pub fn new(resource: &'a Resource, mode: LockMode) -> Result<Self> {
        Self::with_backend(resource, mode, Flock)
    }
}

impl<'a, B: LockBackend> LockHandle<'a, B> {
    /// Like [`LockHandle::new`], over a custom backend.
    pub fn with_backend(resource: &'a Resource, mode: LockMode, backend: B) -> Result<Self> {
        mode.check_access(resource)
            .map(|()| Self::bind(resource, mode, backend))
    }

    /// Exclusive handle over a custom backend.
    #[must_use]
    pub fn exclusive_with_backend(resource: &'a Resource, backend: B) -> Self {
        Self::bind(resource, LockMode::Exclusive, backend)
    }

    fn bind(resource: &'a Resource, mode: LockMode, backend: B) -> Self {
        Self {
            resource,
            mode,
            backend,
            options: LockOptions::default(),
            state: LockState::Unlocked,
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: LockOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub const fn mode(&self) -> LockMode {
        self.mode
    }

    #[must_use]
    pub const fn resource(&self) -> &'a Resource {
        self.resource
    }

    #[must_use]
    pub const fn options(&self) -> &LockOptions {
        &self.options
    }

    /// Acquire the lock, suspending while another holder conflicts.
    ///
    /// Retries forever at `options.retry_interval`. Dropping the returned
    /// future while it waits leaves the handle unlocked.
    ///
    /// # Errors
    ///
    /// - [`Error::AlreadyLocked`] if this handle already holds the lock (no OS call is made)
    /// - [`Error::Lock`] for any OS failure other than contention, without retrying
    pub async fn acquire(&mut self) -> Result<()> {
        self.ensure_state(LockState::Unlocked)?;

        let mut attempt: u64 = 1;
        loop {
            match self.probe()? {
                Attempt::Acquired => {
                    self.state = LockState::Locked;
                    tracing::debug!(
                        "Acquired {} lock on {} after {} attempt(s)",
                        self.mode,
                        self.resource.describe(),
                        attempt
                    );
                    return Ok(());
                }
                Attempt::Contended => {
                    tracing::trace!(
                        "{} lock on {} is contended (attempt {}), retrying in {:?}",
                        self.mode,
                        self.resource.describe(),
                        attempt,
                        self.options.retry_interval
                    );
                    tokio::time::sleep(self.options.retry_interval).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Make exactly one non-blocking attempt.
    ///
    /// Returns `false` on contention, leaving the handle unlocked.
    pub fn try_acquire(&mut self) -> Result<bool> {
        self.ensure_state(LockState::Unlocked)?;

        match self.probe()? {
            Attempt::Acquired => {
                self.state = LockState::Locked;
                tracing::debug!("Acquired {} lock on {}", self.mode, self.resource.describe());
                Ok(true)
            }
            Attempt::Contended => Ok(false),
        }
    }

    /// Release the lock.
    ///
    /// # Errors
    ///
    /// - [`Error::NotLocked`] if this handle does not hold the lock (no OS call is made)
    /// - [`Error::Lock`] if the OS refuses to unlock; the handle stays locked
    pub fn release(&mut self) -> Result<()> {
        self.ensure_state(LockState::Locked)?;

        self.backend
            .unlock(self.resource.file())
            .map_err(|e| Error::lock_failed(LockOperation::Release, self.resource.describe(), e))?;

        self.state = LockState::Unlocked;
        tracing::debug!("Released {} lock on {}", self.mode, self.resource.describe());
        Ok(())
    }

    /// Acquire and return a guard that releases when dropped.
    pub async fn lock(&mut self) -> Result<LockGuard<'_, 'a, B>> {
        self.acquire().await?;
        Ok(LockGuard::new(self))
    }

    /// Single non-blocking attempt returning a guard on success.
    pub fn try_lock(&mut self) -> Result<Option<LockGuard<'_, 'a, B>>> {
        if self.try_acquire()? {
            Ok(Some(LockGuard::new(self)))
        } else {
            Ok(None)
        }
    }

    /// Execute `body` while holding the lock.
    ///
    /// The lock is released whether `body` succeeds, fails, or panics. A body
    /// error takes precedence over a release error, which is then only logged.
    pub async fn with_lock<F, Fut, T, E>(&mut self, body: F) -> std::result::Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: From<Error>,
    {
        let guard = self.lock().await?;
        match body().await {
            Ok(value) => {
                guard.release()?;
                Ok(value)
            }
            Err(err) => {
                if let Err(release_err) = guard.release() {
                    tracing::warn!("Lock release failed after body error: {release_err}");
                }
                Err(err)
            }
        }
    }

    fn probe(&self) -> Result<Attempt> {
        classify(self.backend.try_lock(self.resource.file(), self.mode))
            .map_err(|e| Error::lock_failed(LockOperation::Acquire, self.resource.describe(), e))
    }

    fn ensure_state(&self, expected: LockState) -> Result<()> {
        match (expected, self.state) {
            (LockState::Unlocked, LockState::Locked) => Err(Error::AlreadyLocked {
                resource: self.resource.describe(),
            }),
            (LockState::Locked, LockState::Unlocked) => Err(Error::NotLocked {
                resource: self.resource.describe(),
            }),
            _ => Ok(()),
        }
    }
}

impl<B: LockBackend> Drop for LockHandle<'_, B> {
    fn drop(&mut self) {
        if self.state == LockState::Locked {
            tracing::warn!(
                "{} lock handle on {} dropped while locked; the OS lock stays held until the file is closed",
                self.mode,
                self.resource.describe()
            );
        }
    }
}

/// Scoped lock ownership: releases on drop
///
/// Dropping the guard (end of scope, `?` early return, panic unwinding, task
/// cancellation) releases the lock. Failures during drop can only be logged;
/// call [`LockGuard::release`] to observe them.
#[derive(Debug)]
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct LockGuard<'h, 'a, B: LockBackend = Flock> {
    handle: &'h mut LockHandle<'a, B>,
    released: bool,
}

impl<'h, 'a, B: LockBackend> LockGuard<'h, 'a, B> {
    fn new(handle: &'h mut LockHandle<'a, B>) -> Self {
        Self {
            handle,
            released: false,
        }
    }

    #[must_use]
    pub fn resource(&self) -> &'a Resource {
        self.handle.resource
    }

    #[must_use]
    pub fn mode(&self) -> LockMode {
        self.handle.mode
    }

    /// Release now and report the outcome.
    pub fn release(mut self) -> Result<()> {
        self.released = true;
        self.handle.release()
    }
}

impl<B: LockBackend> Drop for LockGuard<'_, '_, B> {
    fn drop(&mut self) {
        if !self.released {
            if let Err(e) = self.handle.release() {
                tracing::warn!("Failed to release lock on drop: {e}");
            }
        }
    }
}
