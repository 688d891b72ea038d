//! Mount configuration for the shared-folder filesystem.
//!
//! Everything here is fixed for the lifetime of a mount. The defaults match a
//! read-only shared folder owned by root with conventional `022` masks.

use crate::dirent;
use crate::error::{FsError, FsResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default time-to-live for cached attributes (1 second).
pub const DEFAULT_ATTR_TTL: Duration = Duration::from_secs(1);

/// Default time-to-live for negative name cache entries.
pub const DEFAULT_NEGATIVE_TTL: Duration = Duration::from_millis(500);

/// Default byte budget of one directory listing segment.
pub const DEFAULT_SEGMENT_SIZE: usize = 8192;

/// Default cap on a single provider read (the kernel's `MAXPHYS`).
pub const DEFAULT_MAX_TRANSFER: usize = 128 * 1024;

/// Longest single name component, in bytes.
pub const NAME_MAX: usize = 255;

/// Longest provider path, in bytes.
pub const PATH_MAX: usize = 1024;

/// Reported hard link ceiling.
pub const LINK_MAX: u64 = 65535;

/// How names other than `.`, `..` and the well-known name are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupMode {
    /// Only `.`, `..` and the well-known name resolve; everything else is
    /// reported as missing.
    Minimal,
    /// Other names are resolved with a provider stat and get a tracked node.
    #[default]
    Provider,
}

/// Configuration options for a shared-folder mount.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct MountConfig {
    /// Owner reported for every node.
    pub uid: u32,

    /// Group reported for every node.
    pub gid: u32,

    /// Permission bits removed from the base file mode (0444).
    pub file_mask: u32,

    /// Permission bits removed from the base directory mode (0555).
    pub dir_mask: u32,

    /// Whether write access checks fail with `EROFS`.
    pub read_only: bool,

    /// How long a fetched stat snapshot is served without asking the host.
    #[serde(with = "humantime_serde")]
    pub attr_ttl: Duration,

    /// How long a name is remembered as missing.
    #[serde(with = "humantime_serde")]
    pub negative_ttl: Duration,

    /// Byte budget of one directory listing segment.
    pub segment_size: usize,

    /// Maximum bytes requested from the provider per read call.
    pub max_transfer: usize,

    /// Name resolution strategy.
    pub lookup_mode: LookupMode,

    /// Reserved filename that always resolves to the well-known node.
    pub well_known_name: Option<String>,
}

impl Default for MountConfig {
    fn default() -> Self {
        Self {
            uid: 0,
            gid: 0,
            file_mask: 0o022,
            dir_mask: 0o022,
            read_only: true,
            attr_ttl: DEFAULT_ATTR_TTL,
            negative_ttl: DEFAULT_NEGATIVE_TTL,
            segment_size: DEFAULT_SEGMENT_SIZE,
            max_transfer: DEFAULT_MAX_TRANSFER,
            lookup_mode: LookupMode::Provider,
            well_known_name: None,
        }
    }
}

impl MountConfig {
    /// Configuration with the stub resolver: only `.`, `..` and the
    /// well-known name resolve.
    pub fn minimal(well_known_name: impl Into<String>) -> Self {
        Self {
            lookup_mode: LookupMode::Minimal,
            well_known_name: Some(well_known_name.into()),
            ..Default::default()
        }
    }

    /// Sets the reported owner.
    #[must_use]
    pub fn owner(mut self, uid: u32, gid: u32) -> Self {
        self.uid = uid;
        self.gid = gid;
        self
    }

    /// Sets the attribute cache TTL.
    #[must_use]
    pub fn attr_ttl(mut self, ttl: Duration) -> Self {
        self.attr_ttl = ttl;
        self
    }

    /// Sets the negative name cache TTL.
    #[must_use]
    pub fn negative_ttl(mut self, ttl: Duration) -> Self {
        self.negative_ttl = ttl;
        self
    }

    /// Sets the listing segment byte budget.
    #[must_use]
    pub fn segment_size(mut self, size: usize) -> Self {
        self.segment_size = size;
        self
    }

    /// Sets the per-call read cap.
    #[must_use]
    pub fn max_transfer(mut self, size: usize) -> Self {
        self.max_transfer = size;
        self
    }

    /// Sets the lookup mode.
    #[must_use]
    pub fn lookup_mode(mut self, mode: LookupMode) -> Self {
        self.lookup_mode = mode;
        self
    }

    /// Sets the reserved well-known filename.
    #[must_use]
    pub fn well_known_name(mut self, name: impl Into<String>) -> Self {
        self.well_known_name = Some(name.into());
        self
    }

    /// Checks that the configuration can be mounted.
    pub fn validate(&self) -> FsResult<()> {
        let min_segment = dirent::record_len(NAME_MAX);
        if self.segment_size < min_segment {
            return Err(FsError::Config(format!(
                "segment_size {} is smaller than one maximum-size entry ({min_segment} bytes)",
                self.segment_size
            )));
        }
        if self.max_transfer == 0 {
            return Err(FsError::Config("max_transfer must be non-zero".into()));
        }
        if let Some(name) = &self.well_known_name
            && (name.is_empty() || name == "." || name == ".." || name.contains('/'))
        {
            return Err(FsError::Config(format!(
                "well_known_name {name:?} is not a plain filename"
            )));
        }
        if self.file_mask > 0o777 || self.dir_mask > 0o777 {
            return Err(FsError::Config("masks must only cover permission bits".into()));
        }
        Ok(())
    }
}
