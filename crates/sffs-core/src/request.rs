//! Argument types for filesystem operations.

use crate::config::{LINK_MAX, NAME_MAX, PATH_MAX};

/// What the caller intends to do with a looked-up name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NameOp {
    /// Plain lookup.
    #[default]
    Lookup,
    /// The name is about to be created.
    Create,
    /// The name is about to be removed.
    Delete,
    /// The name is the target of a rename.
    Rename,
}

/// Lock mode the caller wants on the returned node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LockMode {
    /// Shared lock.
    #[default]
    Shared,
    /// Exclusive lock.
    Exclusive,
}

/// One path component being resolved, with the caller's intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComponentName<'a> {
    /// The component.
    pub name: &'a str,
    /// Intended operation.
    pub op: NameOp,
    /// True for the final component of the path.
    pub is_last: bool,
    /// Whether the result may be entered in the name cache.
    pub make_entry: bool,
    /// Lock mode requested for the result.
    pub lock: LockMode,
}

impl<'a> ComponentName<'a> {
    /// A plain lookup of the last path component with a shared lock.
    pub fn lookup(name: &'a str) -> Self {
        Self {
            name,
            op: NameOp::Lookup,
            is_last: true,
            make_entry: true,
            lock: LockMode::Shared,
        }
    }

    /// Sets the intended operation.
    #[must_use]
    pub fn op(mut self, op: NameOp) -> Self {
        self.op = op;
        self
    }

    /// Marks the component as an intermediate one.
    #[must_use]
    pub fn intermediate(mut self) -> Self {
        self.is_last = false;
        self
    }

    /// Requests an exclusive lock on the result.
    #[must_use]
    pub fn exclusive(mut self) -> Self {
        self.lock = LockMode::Exclusive;
        self
    }

    /// Keeps the result out of the name cache.
    #[must_use]
    pub fn no_cache(mut self) -> Self {
        self.make_entry = false;
        self
    }

    /// Returns true when a missing name is about to be created or renamed onto.
    pub fn wants_to_create(&self) -> bool {
        self.is_last && matches!(self.op, NameOp::Create | NameOp::Rename)
    }
}

/// Access bits requested in an access check (`R_OK`, `W_OK`, `X_OK`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AccessMode(u32);

impl AccessMode {
    /// Read access.
    pub const READ: Self = Self(4);
    /// Write access.
    pub const WRITE: Self = Self(2);
    /// Execute or search access.
    pub const EXEC: Self = Self(1);

    /// Builds a mode from raw `R_OK | W_OK | X_OK` bits.
    pub fn from_bits(bits: u32) -> Self {
        Self(bits & 0o7)
    }

    /// The raw bits.
    pub fn bits(self) -> u32 {
        self.0
    }

    /// Returns true if every bit of `other` is requested.
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for AccessMode {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Identity of the caller of an access check.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Credentials {
    /// Effective user id.
    pub uid: u32,
    /// Effective group id.
    pub gid: u32,
    /// Supplementary groups.
    pub groups: Vec<u32>,
}

impl Credentials {
    /// Credentials for `uid`/`gid` with no supplementary groups.
    pub fn new(uid: u32, gid: u32) -> Self {
        Self {
            uid,
            gid,
            groups: Vec::new(),
        }
    }

    /// The superuser.
    pub fn root() -> Self {
        Self::new(0, 0)
    }

    /// Returns true if the caller belongs to `gid`.
    pub fn in_group(&self, gid: u32) -> bool {
        self.gid == gid || self.groups.contains(&gid)
    }
}

/// Configurable limit names accepted by pathconf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathconfName {
    /// Maximum hard link count.
    LinkMax,
    /// Maximum name component length.
    NameMax,
    /// Maximum path length.
    PathMax,
    /// Any other name, by raw value.
    Other(i32),
}

impl PathconfName {
    /// Decodes a raw `_PC_*` value.
    pub fn from_raw(name: i32) -> Self {
        match name {
            libc::_PC_LINK_MAX => Self::LinkMax,
            libc::_PC_NAME_MAX => Self::NameMax,
            libc::_PC_PATH_MAX => Self::PathMax,
            other => Self::Other(other),
        }
    }

    /// The fixed value for this limit, if it has one.
    pub fn value(self) -> Option<u64> {
        match self {
            Self::LinkMax => Some(LINK_MAX),
            Self::NameMax => Some(NAME_MAX as u64),
            Self::PathMax => Some(PATH_MAX as u64),
            Self::Other(_) => None,
        }
    }
}

/// Address space of a read buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UioSegment {
    /// The buffer belongs to a user process.
    #[default]
    User,
    /// The buffer is kernel memory.
    Kernel,
}

impl UioSegment {
    /// Returns true for kernel buffers.
    pub fn is_kernel(self) -> bool {
        self == Self::Kernel
    }
}
