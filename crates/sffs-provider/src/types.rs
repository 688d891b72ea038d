//! Data exchanged with the shared-folder provider.

use serde::Serialize;
use std::fmt;
use std::time::SystemTime;

/// Mask for the file type bits of a mode.
pub const S_IFMT: u32 = 0o170000;
/// Named pipe.
pub const S_IFIFO: u32 = 0o010000;
/// Character device.
pub const S_IFCHR: u32 = 0o020000;
/// Directory.
pub const S_IFDIR: u32 = 0o040000;
/// Block device.
pub const S_IFBLK: u32 = 0o060000;
/// Regular file.
pub const S_IFREG: u32 = 0o100000;
/// Symbolic link.
pub const S_IFLNK: u32 = 0o120000;
/// Socket.
pub const S_IFSOCK: u32 = 0o140000;

/// The type of a host object, decoded from the `S_IFMT` bits of its mode.
///
/// The host reports modes in the POSIX layout regardless of the host OS, so
/// these constants are fixed rather than taken from the guest's libc.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileType {
    /// Regular file.
    Regular,
    /// Directory.
    Directory,
    /// Symbolic link.
    Symlink,
    /// Named pipe.
    Fifo,
    /// Character device.
    CharDevice,
    /// Block device.
    BlockDevice,
    /// Socket.
    Socket,
    /// Type bits the adapter does not recognize.
    Unknown,
}

impl FileType {
    /// Decodes the type bits of a mode.
    pub fn from_mode(mode: u32) -> Self {
        match mode & S_IFMT {
            S_IFREG => Self::Regular,
            S_IFDIR => Self::Directory,
            S_IFLNK => Self::Symlink,
            S_IFIFO => Self::Fifo,
            S_IFCHR => Self::CharDevice,
            S_IFBLK => Self::BlockDevice,
            S_IFSOCK => Self::Socket,
            _ => Self::Unknown,
        }
    }

    /// Returns the `S_IFMT` bits for this type (zero for [`FileType::Unknown`]).
    pub fn type_bits(self) -> u32 {
        match self {
            Self::Regular => S_IFREG,
            Self::Directory => S_IFDIR,
            Self::Symlink => S_IFLNK,
            Self::Fifo => S_IFIFO,
            Self::CharDevice => S_IFCHR,
            Self::BlockDevice => S_IFBLK,
            Self::Socket => S_IFSOCK,
            Self::Unknown => 0,
        }
    }

    /// Returns true for directories.
    #[inline]
    pub fn is_dir(self) -> bool {
        self == Self::Directory
    }

    /// Returns true for regular files.
    #[inline]
    pub fn is_regular(self) -> bool {
        self == Self::Regular
    }

    /// Short lowercase name, as used in listings and diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            Self::Regular => "file",
            Self::Directory => "directory",
            Self::Symlink => "symlink",
            Self::Fifo => "fifo",
            Self::CharDevice => "char-device",
            Self::BlockDevice => "block-device",
            Self::Socket => "socket",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Presentation-layer stat result returned by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatSnapshot {
    /// Type and permission bits.
    pub mode: u32,
    /// Logical size in bytes.
    pub size: u64,
    /// Bytes allocated on the host.
    pub alloc: u64,
    /// Last access time, if the host reported one.
    pub atime: Option<SystemTime>,
    /// Last modification time, if the host reported one.
    pub mtime: Option<SystemTime>,
    /// Last status change time, if the host reported one.
    pub ctime: Option<SystemTime>,
}

impl StatSnapshot {
    /// A snapshot with the given mode and size and no timestamps.
    pub fn new(mode: u32, size: u64) -> Self {
        Self {
            mode,
            size,
            alloc: size,
            atime: None,
            mtime: None,
            ctime: None,
        }
    }

    /// A synthetic directory snapshot.
    pub fn directory() -> Self {
        Self::new(S_IFDIR | 0o755, 0)
    }

    /// A synthetic regular-file snapshot of the given size.
    pub fn regular(size: u64) -> Self {
        Self::new(S_IFREG | 0o644, size)
    }

    /// The file type encoded in `mode`.
    #[inline]
    pub fn file_type(&self) -> FileType {
        FileType::from_mode(self.mode)
    }

    /// Sets all three timestamps.
    #[must_use]
    pub fn with_times(mut self, time: SystemTime) -> Self {
        self.atime = Some(time);
        self.mtime = Some(time);
        self.ctime = Some(time);
        self
    }
}

/// One entry of a host directory listing, in provider order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderEntry {
    /// Entry name (a single path component).
    pub name: String,
    /// Stat snapshot taken at enumeration time.
    pub stat: StatSnapshot,
}

impl ProviderEntry {
    /// Creates an entry.
    pub fn new(name: impl Into<String>, stat: StatSnapshot) -> Self {
        Self {
            name: name.into(),
            stat,
        }
    }
}

/// Opaque handle to a host object opened with
/// [`ProviderClient::open_path`](crate::ProviderClient::open_path).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProviderHandle(pub u64);

impl ProviderHandle {
    /// The raw handle value.
    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ProviderHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
