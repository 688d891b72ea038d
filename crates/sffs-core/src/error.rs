//! Error handling and errno mapping for the shared-folder filesystem.
//!
//! Every operation result is ultimately a POSIX errno handed back to the
//! kernel. [`FsError`] carries enough context for logs and also knows which
//! [`ErrorClass`] it belongs to, so callers can tell "this filesystem never
//! does that" apart from "the host said no".

use crate::node::NodeId;
use sffs_provider::ProviderError;
use std::io;
use thiserror::Error;

/// Errors returned by filesystem operations.
#[derive(Debug, Error)]
pub enum FsError {
    /// The provider call failed; its errno is passed through unchanged.
    #[error("provider call failed: {0}")]
    Provider(#[from] ProviderError),

    /// The operation is not implemented by this filesystem.
    #[error("operation not supported")]
    NotSupported,

    /// The mount refuses modifications.
    #[error("read-only filesystem")]
    ReadOnly,

    /// No device-control commands exist.
    #[error("inappropriate ioctl for device")]
    NotTty,

    /// A file operation was attempted on a directory.
    #[error("is a directory")]
    IsDirectory,

    /// A directory operation was attempted on a non-directory.
    #[error("not a directory")]
    NotDirectory,

    /// Malformed argument or cursor.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// The node has no open provider handle.
    #[error("node {0} has no open provider handle")]
    NoHandle(NodeId),

    /// The name does not resolve.
    #[error("no such file or directory: {0}")]
    NotFound(String),

    /// A name component or path is too long.
    #[error("name too long ({0} bytes)")]
    NameTooLong(usize),

    /// The node is still referenced or open.
    #[error("node {0} is busy")]
    Busy(NodeId),

    /// The caller lacks the requested access.
    #[error("permission denied")]
    PermissionDenied,

    /// The node id is no longer in the node table.
    #[error("stale node {0}")]
    Stale(NodeId),

    /// The mount configuration is unusable.
    #[error("invalid mount configuration: {0}")]
    Config(String),
}

/// Broad category of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// The filesystem does not implement the operation.
    Capability,
    /// The host reported the failure.
    Provider,
    /// The caller violated an operation's contract (bad cursor, wrong node
    /// type, missing handle, live references).
    Contract,
    /// Mount policy forbids the operation.
    Policy,
}

impl FsError {
    /// Converts this error to a libc error code.
    pub fn to_errno(&self) -> i32 {
        match self {
            Self::Provider(e) => e.errno(),
            Self::NotSupported => libc::EOPNOTSUPP,
            Self::ReadOnly => libc::EROFS,
            Self::NotTty => libc::ENOTTY,
            Self::IsDirectory => libc::EISDIR,
            Self::NotDirectory => libc::ENOTDIR,
            Self::InvalidArgument(_) | Self::Config(_) => libc::EINVAL,
            Self::NoHandle(_) => libc::ENXIO,
            Self::NotFound(_) => libc::ENOENT,
            Self::NameTooLong(_) => libc::ENAMETOOLONG,
            Self::Busy(_) => libc::EBUSY,
            Self::PermissionDenied => libc::EACCES,
            Self::Stale(_) => libc::ESTALE,
        }
    }

    /// Returns the category of this error.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::NotSupported | Self::NotTty => ErrorClass::Capability,
            Self::Provider(_) | Self::NotFound(_) => ErrorClass::Provider,
            Self::ReadOnly | Self::PermissionDenied => ErrorClass::Policy,
            Self::IsDirectory
            | Self::NotDirectory
            | Self::InvalidArgument(_)
            | Self::NoHandle(_)
            | Self::NameTooLong(_)
            | Self::Busy(_)
            | Self::Stale(_)
            | Self::Config(_) => ErrorClass::Contract,
        }
    }

    /// Returns true for a missing-name answer, from the provider or the
    /// resolver itself.
    pub fn is_not_found(&self) -> bool {
        self.to_errno() == libc::ENOENT
    }
}

/// Result type for filesystem operations.
pub type FsResult<T> = Result<T, FsError>;

/// Extension trait to convert errors to errno.
pub trait ToErrno {
    /// Converts this error to a libc error code.
    fn to_errno(&self) -> i32;
}

impl ToErrno for FsError {
    fn to_errno(&self) -> i32 {
        FsError::to_errno(self)
    }
}

impl ToErrno for ProviderError {
    fn to_errno(&self) -> i32 {
        self.errno()
    }
}

impl ToErrno for io::Error {
    fn to_errno(&self) -> i32 {
        sffs_provider::io_error_to_errno(self)
    }
}
