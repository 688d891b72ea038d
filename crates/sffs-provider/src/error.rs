//! Provider errors and their errno mapping.
//!
//! Provider failures are surfaced to the kernel verbatim, so every variant
//! knows the POSIX errno it stands for.

use crate::types::ProviderHandle;
use std::io;
use thiserror::Error;

/// A failure reported by the host side of the shared folder.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// A host I/O call failed.
    #[error("host I/O failed for {path}: {source}")]
    Io {
        /// Provider path the call was made for.
        path: String,
        /// The underlying host error.
        #[source]
        source: io::Error,
    },

    /// The handle is not (or no longer) open on the host.
    #[error("unknown provider handle {0}")]
    InvalidHandle(ProviderHandle),

    /// The path tried to leave the shared folder root.
    #[error("path escapes the shared folder: {0}")]
    PathEscape(String),

    /// The host answered with a raw error code.
    #[error("host returned error code {0}")]
    Host(i32),
}

impl ProviderError {
    /// Wraps an I/O error for the given provider path.
    pub fn io(path: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// The POSIX errno this error stands for.
    pub fn errno(&self) -> i32 {
        match self {
            Self::Io { source, .. } => io_error_to_errno(source),
            Self::InvalidHandle(_) => libc::EBADF,
            Self::PathEscape(_) => libc::EACCES,
            Self::Host(code) => *code,
        }
    }

    /// Returns true if the host reported that the object does not exist.
    pub fn is_not_found(&self) -> bool {
        self.errno() == libc::ENOENT
    }
}

/// Result type for provider calls.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Converts an I/O error to a POSIX errno value.
///
/// Uses the raw OS error when there is one, otherwise classifies by kind and
/// falls back to `EIO`.
#[inline]
pub fn io_error_to_errno(e: &io::Error) -> i32 {
    if let Some(code) = e.raw_os_error() {
        return code;
    }
    match e.kind() {
        io::ErrorKind::NotFound => libc::ENOENT,
        io::ErrorKind::PermissionDenied => libc::EACCES,
        io::ErrorKind::AlreadyExists => libc::EEXIST,
        io::ErrorKind::InvalidInput | io::ErrorKind::InvalidData => libc::EINVAL,
        io::ErrorKind::Unsupported => libc::EOPNOTSUPP,
        _ => libc::EIO,
    }
}
