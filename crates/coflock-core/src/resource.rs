//! Open file resources that locks bind to.
//!
//! A [`Resource`] pairs an open file with the [`AccessMode`] it was opened
//! with, because `std::fs::File` does not expose that itself. The caller owns
//! the resource; lock handles only borrow it.

use std::{
    fs::File,
    path::{Path, PathBuf},
};

use crate::{mode::AccessMode, Error, Result};

/// An open file plus the access mode it was opened with.
#[derive(Debug)]
pub struct Resource {
    file: File,
    access: AccessMode,
    path: Option<PathBuf>,
}

impl Resource {
    /// Open `path` with the given access mode.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be opened.
    pub fn open(path: impl AsRef<Path>, access: AccessMode) -> Result<Self> {
        let path = path.as_ref();
        access
            .open_options()
            .open(path)
            .map(|file| Self::from_file_at(file, access, path))
            .map_err(|e| Error::io(format!("Failed to open '{}' {access}", path.display()), e))
    }

    /// Open `path` for reading only.
    pub fn open_read_only(path: impl AsRef<Path>) -> Result<Self> {
        Self::open(path, AccessMode::ReadOnly)
    }

    /// Open `path` for reading and writing, creating it if missing.
    pub fn open_read_write(path: impl AsRef<Path>) -> Result<Self> {
        Self::open(path, AccessMode::ReadWrite)
    }

    /// Wrap a file the caller already opened.
    ///
    /// `access` must describe how `file` was really opened; it is trusted,
    /// not checked.
    #[must_use]
    pub const fn from_file(file: File, access: AccessMode) -> Self {
        Self {
            file,
            access,
            path: None,
        }
    }

    /// Like [`from_file`](Self::from_file), remembering the path for diagnostics.
    #[must_use]
    pub fn from_file_at(file: File, access: AccessMode, path: impl Into<PathBuf>) -> Self {
        Self {
            file,
            access,
            path: Some(path.into()),
        }
    }

    #[must_use]
    pub const fn file(&self) -> &File {
        &self.file
    }

    #[must_use]
    pub const fn access(&self) -> AccessMode {
        self.access
    }

    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Human-readable name used in logs and errors.
    #[must_use]
    pub fn describe(&self) -> String {
        self.path.as_ref().map_or_else(
            || "<anonymous file>".to_string(),
            |p| format!("'{}'", p.display()),
        )
    }

    #[must_use]
    pub fn into_file(self) -> File {
        self.file
    }
}
