//! Lock modes, resource access modes, and the policy tying them together.

use std::{fmt, fs::OpenOptions, str::FromStr};

use crate::{resource::Resource, Error, Result};

/// The advisory lock mode a handle requests.
///
/// Fixed per handle for its whole lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LockMode {
    /// One holder system-wide; conflicts with every other holder.
    #[default]
    Exclusive,
    /// Any number of holders; conflicts only with an exclusive holder.
    Shared,
}

impl LockMode {
    /// Whether a holder in `self` mode excludes a holder in `other` mode.
    #[must_use]
    pub const fn conflicts_with(self, other: Self) -> bool {
        !matches!((self, other), (Self::Shared, Self::Shared))
    }

    /// Whether this mode may be requested over a resource opened with `access`.
    ///
    /// Shared locks are only taken on read-only resources; exclusive locks
    /// accept any access mode.
    #[must_use]
    pub const fn admits(self, access: AccessMode) -> bool {
        match self {
            Self::Exclusive => true,
            Self::Shared => matches!(access, AccessMode::ReadOnly),
        }
    }

    /// Check `resource` against [`admits`](Self::admits).
    ///
    /// Pure precondition check: no lock call is made.
    pub fn check_access(self, resource: &Resource) -> Result<()> {
        if self.admits(resource.access()) {
            Ok(())
        } else {
            Err(Error::BadResourceMode {
                resource: resource.describe(),
                access: resource.access(),
            })
        }
    }
}

impl fmt::Display for LockMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exclusive => write!(f, "exclusive"),
            Self::Shared => write!(f, "shared"),
        }
    }
}

impl FromStr for LockMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "exclusive" | "ex" | "write" => Ok(Self::Exclusive),
            "shared" | "sh" | "read" => Ok(Self::Shared),
            _ => Err(Error::InvalidConfig(format!(
                "Invalid lock mode: {s}. Must be one of: exclusive, shared"
            ))),
        }
    }
}

/// The read/write capability a resource was opened with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessMode {
    ReadOnly,
    WriteOnly,
    ReadWrite,
    Append,
}

impl AccessMode {
    /// Open options matching this access mode.
    ///
    /// Everything except `ReadOnly` creates the file when missing; nothing
    /// truncates.
    #[must_use]
    pub fn open_options(self) -> OpenOptions {
        let mut options = OpenOptions::new();
        match self {
            Self::ReadOnly => options.read(true),
            Self::WriteOnly => options.write(true).create(true).truncate(false),
            Self::ReadWrite => options.read(true).write(true).create(true).truncate(false),
            Self::Append => options.append(true).create(true),
        };
        options
    }

    /// Whether the resource may be written through.
    #[must_use]
    pub const fn is_writable(self) -> bool {
        !matches!(self, Self::ReadOnly)
    }
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadOnly => write!(f, "read-only"),
            Self::WriteOnly => write!(f, "write-only"),
            Self::ReadWrite => write!(f, "read-write"),
            Self::Append => write!(f, "append"),
        }
    }
}

impl FromStr for AccessMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "read-only" | "readonly" | "r" => Ok(Self::ReadOnly),
            "write-only" | "writeonly" | "w" => Ok(Self::WriteOnly),
            "read-write" | "readwrite" | "r+" | "w+" => Ok(Self::ReadWrite),
            "append" | "a" | "a+" => Ok(Self::Append),
            _ => Err(Error::InvalidConfig(format!(
                "Invalid access mode: {s}. Must be one of: read-only, write-only, read-write, append"
            ))),
        }
    }
}
