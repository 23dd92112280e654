//! Shared (read) locks over read-only resources.
//!
//! [`SharedLock`] is a thin policy layer over [`LockHandle`]: it fixes the
//! mode to [`LockMode::Shared`] and refuses, at construction, any resource
//! that was not opened strictly read-only. Everything after construction is
//! delegated unchanged.

use std::future::Future;

use crate::{
    backend::{Flock, LockBackend},
    config::LockOptions,
    filelock::{LockGuard, LockHandle},
    mode::LockMode,
    resource::Resource,
    Error, Result,
};

/// A shared lock binding over a read-only [`Resource`].
///
/// ```no_run
/// use std::io::Read;
///
/// use coflock_core::{Resource, SharedLock};
///
/// # async fn example() -> Result<(), coflock_core::Error> {
/// let resource = Resource::open_read_only("/tmp/counter.txt")?;
/// let mut lock = SharedLock::new(&resource)?;
///
/// let guard = lock.lock().await?;
/// let mut content = String::new();
/// guard
///     .resource()
///     .file()
///     .read_to_string(&mut content)
///     .map_err(|e| coflock_core::Error::io("read counter", e))?;
/// guard.release()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct SharedLock<'a, B: LockBackend = Flock> {
    inner: LockHandle<'a, B>,
}

impl<'a> SharedLock<'a, Flock> {
    /// # Errors
    ///
    /// [`Error::BadResourceMode`] if `resource` is not read-only. No lock
    /// call is made in that case.
    pub fn new(resource: &'a Resource) -> Result<Self> {
        Self::with_backend(resource, Flock)
    }
}

impl<'a, B: LockBackend> SharedLock<'a, B> {
    pub fn with_backend(resource: &'a Resource, backend: B) -> Result<Self> {
        LockHandle::with_backend(resource, LockMode::Shared, backend).map(|inner| Self { inner })
    }

    #[must_use]
    pub fn with_options(self, options: LockOptions) -> Self {
        Self {
            inner: self.inner.with_options(options),
        }
    }

    #[must_use]
    pub const fn resource(&self) -> &'a Resource {
        self.inner.resource()
    }

    /// The wrapped handle, for code that works with either mode.
    pub fn as_handle_mut(&mut self) -> &mut LockHandle<'a, B> {
        &mut self.inner
    }

    pub async fn acquire(&mut self) -> Result<()> {
        self.inner.acquire().await
    }

    pub fn try_acquire(&mut self) -> Result<bool> {
        self.inner.try_acquire()
    }

    pub fn release(&mut self) -> Result<()> {
        self.inner.release()
    }

    pub async fn lock(&mut self) -> Result<LockGuard<'_, 'a, B>> {
        self.inner.lock().await
    }

    pub fn try_lock(&mut self) -> Result<Option<LockGuard<'_, 'a, B>>> {
        self.inner.try_lock()
    }

    pub async fn with_lock<F, Fut, T, E>(&mut self, body: F) -> std::result::Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: From<Error>,
    {
        self.inner.with_lock(body).await
    }
}
