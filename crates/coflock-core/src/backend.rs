//! The OS seam: non-blocking advisory lock and unlock primitives.
//!
//! Backends are synchronous and never wait. Turning "would block" into a
//! cooperative wait is the job of [`LockHandle`](crate::LockHandle).

use std::{fs::File, io};

use fs2::FileExt;

use crate::mode::LockMode;

/// Non-blocking advisory lock primitive over an open file.
pub trait LockBackend {
    /// Make a single non-blocking attempt to lock `file` in `mode`.
    ///
    /// Contention must be reported as an error that [`classify`] maps to
    /// [`Attempt::Contended`].
    fn try_lock(&self, file: &File, mode: LockMode) -> io::Result<()>;

    /// Release whatever lock this descriptor holds.
    fn unlock(&self, file: &File) -> io::Result<()>;
}

/// `flock(2)`-style locks through `fs2`.
///
/// Locks belong to the open file description, so two files opened separately
/// on the same path contend with each other even inside one process.
#[derive(Debug, Clone, Copy, Default)]
pub struct Flock;

// Fully qualified calls: std's inherent `File::try_lock_shared`/`unlock`
// would otherwise shadow the fs2 trait methods.
impl LockBackend for Flock {
    fn try_lock(&self, file: &File, mode: LockMode) -> io::Result<()> {
        match mode {
            LockMode::Exclusive => FileExt::try_lock_exclusive(file),
            LockMode::Shared => FileExt::try_lock_shared(file),
        }
    }

    fn unlock(&self, file: &File) -> io::Result<()> {
        FileExt::unlock(file)
    }
}

/// Outcome of a single non-blocking lock attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    Acquired,
    /// Held incompatibly by another holder; worth retrying.
    Contended,
}

/// Split a raw attempt result into success, contention, or a fatal error.
pub fn classify(result: io::Result<()>) -> io::Result<Attempt> {
    match result {
        Ok(()) => Ok(Attempt::Acquired),
        Err(e) if is_contention(&e) => Ok(Attempt::Contended),
        Err(e) => Err(e),
    }
}

/// Whether `err` means "lock currently held incompatibly".
#[must_use]
pub fn is_contention(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::WouldBlock
        || err
            .raw_os_error()
            .is_some_and(|code| fs2::lock_contended_error().raw_os_error() == Some(code))
}
