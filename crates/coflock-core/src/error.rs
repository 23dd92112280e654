//! Error types for coflock
//!
//! Errors fall into three groups:
//!
//! - **Validation**: configuration and lock-mode/access-mode mismatches (exit code 1)
//! - **System**: OS failures while opening files or calling the lock primitive (exit code 2)
//! - **Protocol misuse**: acquiring a held lock or releasing a free one (exit code 3)
//!
//! Contention is deliberately absent: a lock held by someone else is retried
//! inside [`LockHandle::acquire`](crate::LockHandle::acquire) and never
//! surfaces as an error.

use std::{fmt, io};

use thiserror::Error;

use crate::mode::AccessMode;

/// The OS-level lock operation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockOperation {
    Acquire,
    Release,
}

impl fmt::Display for LockOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Acquire => write!(f, "acquire"),
            Self::Release => write!(f, "release"),
        }
    }
}

/// Core error type for coflock operations
#[derive(Debug, Error)]
pub enum Error {
    /// A shared lock was requested over a resource not opened read-only.
    #[error("cannot take a shared lock on {resource}: it is opened {access}, shared locks require read-only")]
    BadResourceMode {
        resource: String,
        access: AccessMode,
    },

    /// The OS lock primitive failed with something other than contention.
    #[error("failed to {operation} lock on {resource}: {source}")]
    Lock {
        operation: LockOperation,
        resource: String,
        #[source]
        source: io::Error,
    },

    /// `acquire` was called on a handle that already holds its lock.
    #[error("lock on {resource} is already held by this handle")]
    AlreadyLocked { resource: String },

    /// `release` was called on a handle that does not hold its lock.
    #[error("lock on {resource} is not held by this handle")]
    NotLocked { resource: String },

    /// Filesystem error outside the lock primitive (opening files, reading config).
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Create a lock failure for the given operation.
    pub fn lock_failed(operation: LockOperation, resource: impl Into<String>, source: io::Error) -> Self {
        Self::Lock {
            operation,
            resource: resource.into(),
            source,
        }
    }

    /// Create an IO error with context.
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// The underlying OS error, if this error came from the OS.
    #[must_use]
    pub fn os_error(&self) -> Option<&io::Error> {
        match self {
            Self::Lock { source, .. } | Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Process exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidConfig(_) | Self::BadResourceMode { .. } => 1,
            Self::Lock { .. } | Self::Io { .. } => 2,
            Self::AlreadyLocked { .. } | Self::NotLocked { .. } => 3,
        }
    }
}

/// Result type alias for coflock operations
pub type Result<T> = std::result::Result<T, Error>;
