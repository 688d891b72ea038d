//! Attribute caching and synthesis.
//!
//! Each node keeps the last stat snapshot it saw from the provider. The
//! snapshot is served as-is for a TTL; after that, getattr asks the provider
//! again and falls back to the old snapshot if the host does not answer.
//! Ownership and permission bits are never taken from the host: they come
//! from the mount configuration.

use crate::config::MountConfig;
use crate::node::{NodeId, NodeKind};
use serde::Serialize;
use sffs_provider::StatSnapshot;
use std::time::{Duration, Instant, SystemTime};

/// Block size used for `blocks` accounting.
pub const BLOCK_SIZE: u32 = 512;

/// Base permission bits for directories before masking.
const DIR_BASE_MODE: u32 = 0o555;

/// Base permission bits for everything else before masking.
const FILE_BASE_MODE: u32 = 0o444;

/// Cached stat snapshot for a single node.
#[derive(Debug, Clone, Default)]
pub struct AttrCache {
    stat: Option<StatSnapshot>,
    fetched: Option<Instant>,
    fresh: bool,
}

impl AttrCache {
    /// Creates a cache seeded with a snapshot fetched just now.
    pub fn new(stat: StatSnapshot) -> Self {
        Self {
            stat: Some(stat),
            fetched: Some(Instant::now()),
            fresh: true,
        }
    }

    /// Returns the snapshot if it was fetched less than `ttl` ago and has not
    /// been invalidated since.
    pub fn get_fresh(&self, ttl: Duration) -> Option<StatSnapshot> {
        match (self.fresh, self.fetched) {
            (true, Some(at)) if at.elapsed() < ttl => self.stat,
            _ => None,
        }
    }

    /// The most recent snapshot regardless of age.
    pub fn last_known(&self) -> Option<StatSnapshot> {
        self.stat
    }

    /// Replaces the snapshot with a freshly fetched one.
    pub fn store(&mut self, stat: StatSnapshot) {
        self.stat = Some(stat);
        self.fetched = Some(Instant::now());
        self.fresh = true;
    }

    /// Marks the snapshot stale. It stays available as the fallback.
    pub fn invalidate(&mut self) {
        self.fresh = false;
    }

    /// Returns true if the snapshot has not been invalidated.
    pub fn is_fresh(&self) -> bool {
        self.fresh
    }
}

/// Attributes reported to the kernel for a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Attributes {
    /// Object type.
    pub kind: NodeKind,
    /// Type bits plus masked permission bits.
    pub mode: u32,
    /// Link count: 2 for directories, 1 otherwise.
    pub nlink: u32,
    /// Owner from the mount configuration.
    pub uid: u32,
    /// Group from the mount configuration.
    pub gid: u32,
    /// Device number; always 0.
    pub rdev: u64,
    /// Logical size in bytes.
    pub size: u64,
    /// Preferred I/O block size.
    pub blocksize: u32,
    /// Allocated size in 512-byte blocks.
    pub blocks: u64,
    /// Allocated size in bytes.
    pub bytes: u64,
    /// The node id.
    pub fileid: NodeId,
    /// Mount identifier.
    pub fsid: u64,
    /// Generation number; always 0.
    pub generation: u64,
    /// File flags; always 0.
    pub flags: u32,
    /// Last access time from the host.
    pub atime: Option<SystemTime>,
    /// Last modification time from the host.
    pub mtime: Option<SystemTime>,
    /// Last status change time from the host.
    pub ctime: Option<SystemTime>,
}

impl Attributes {
    /// Builds reported attributes from a host snapshot.
    pub fn synthesize(
        kind: NodeKind,
        fileid: NodeId,
        stat: &StatSnapshot,
        config: &MountConfig,
        fsid: u64,
    ) -> Self {
        let (perm, nlink) = if kind.is_dir() {
            (DIR_BASE_MODE & !config.dir_mask, 2)
        } else {
            (FILE_BASE_MODE & !config.file_mask, 1)
        };
        Self {
            kind,
            mode: kind.type_bits() | perm,
            nlink,
            uid: config.uid,
            gid: config.gid,
            rdev: 0,
            size: stat.size,
            blocksize: BLOCK_SIZE,
            blocks: stat.alloc.div_ceil(u64::from(BLOCK_SIZE)),
            bytes: stat.alloc,
            fileid,
            fsid,
            generation: 0,
            flags: 0,
            atime: stat.atime,
            mtime: stat.mtime,
            ctime: stat.ctime,
        }
    }

    /// Permission bits only.
    pub fn perm(&self) -> u32 {
        self.mode & 0o7777
    }
}

/// Requested attribute changes; `None` fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetAttr {
    /// New permission bits.
    pub mode: Option<u32>,
    /// New owner.
    pub uid: Option<u32>,
    /// New group.
    pub gid: Option<u32>,
    /// New size (truncate or extend).
    pub size: Option<u64>,
    /// New access time.
    pub atime: Option<SystemTime>,
    /// New modification time.
    pub mtime: Option<SystemTime>,
    /// New status change time.
    pub ctime: Option<SystemTime>,
    /// New file flags.
    pub flags: Option<u32>,
}

impl SetAttr {
    /// A request that changes nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests a size change.
    #[must_use]
    pub fn size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    /// Requests a permission change.
    #[must_use]
    pub fn mode(mut self, mode: u32) -> Self {
        self.mode = Some(mode);
        self
    }

    /// Requests an ownership change.
    #[must_use]
    pub fn owner(mut self, uid: u32, gid: u32) -> Self {
        self.uid = Some(uid);
        self.gid = Some(gid);
        self
    }

    /// Requests new access and modification times.
    #[must_use]
    pub fn times(mut self, atime: SystemTime, mtime: SystemTime) -> Self {
        self.atime = Some(atime);
        self.mtime = Some(mtime);
        self
    }

    /// Requests new file flags.
    #[must_use]
    pub fn flags(mut self, flags: u32) -> Self {
        self.flags = Some(flags);
        self
    }

    /// Returns true if anything other than the size would change.
    pub fn changes_metadata(&self) -> bool {
        self.mode.is_some()
            || self.uid.is_some()
            || self.gid.is_some()
            || self.atime.is_some()
            || self.mtime.is_some()
            || self.ctime.is_some()
            || self.flags.is_some()
    }

    /// Returns true if the request changes nothing at all.
    pub fn is_empty(&self) -> bool {
        !self.changes_metadata() && self.size.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sffs_provider::{FileType, S_IFDIR, S_IFREG};
    use std::thread;

    #[test]
    fn test_fresh_within_ttl() {
        let cache = AttrCache::new(StatSnapshot::regular(10));
        assert!(cache.get_fresh(Duration::from_secs(60)).is_some());
        assert!(cache.is_fresh());
    }

    #[test]
    fn test_expired_after_ttl() {
        let cache = AttrCache::new(StatSnapshot::regular(10));
        thread::sleep(Duration::from_millis(20));
        assert!(cache.get_fresh(Duration::from_millis(10)).is_none());
        assert_eq!(cache.last_known().map(|s| s.size), Some(10));
    }

    #[test]
    fn test_invalidate_keeps_fallback() {
        let mut cache = AttrCache::new(StatSnapshot::regular(10));
        cache.invalidate();
        assert!(cache.get_fresh(Duration::from_secs(60)).is_none());
        assert!(cache.last_known().is_some());

        cache.store(StatSnapshot::regular(20));
        assert_eq!(cache.get_fresh(Duration::from_secs(60)).map(|s| s.size), Some(20));
    }

    #[test]
    fn test_empty_cache_has_nothing() {
        let cache = AttrCache::default();
        assert!(cache.get_fresh(Duration::from_secs(60)).is_none());
        assert!(cache.last_known().is_none());
    }

    #[test]
    fn test_synthesize_directory() {
        let config = MountConfig::default().owner(501, 20);
        let attrs = Attributes::synthesize(FileType::Directory, 2, &StatSnapshot::directory(), &config, 9);
        assert_eq!(attrs.mode, S_IFDIR | 0o555);
        assert_eq!(attrs.nlink, 2);
        assert_eq!(attrs.uid, 501);
        assert_eq!(attrs.gid, 20);
        assert_eq!(attrs.fileid, 2);
        assert_eq!(attrs.fsid, 9);
        assert_eq!(attrs.blocksize, 512);
    }

    #[test]
    fn test_synthesize_file_applies_mask_and_blocks() {
        let mut config = MountConfig::default();
        config.file_mask = 0o044;
        let mut stat = StatSnapshot::regular(1000);
        stat.alloc = 1025;
        let attrs = Attributes::synthesize(FileType::Regular, 7, &stat, &config, 1);
        assert_eq!(attrs.mode, S_IFREG | 0o400);
        assert_eq!(attrs.perm(), 0o400);
        assert_eq!(attrs.nlink, 1);
        assert_eq!(attrs.size, 1000);
        assert_eq!(attrs.blocks, 3);
        assert_eq!(attrs.bytes, 1025);
    }

    #[test]
    fn test_host_permissions_are_ignored() {
        let config = MountConfig::default();
        let stat = StatSnapshot::new(S_IFREG | 0o777, 5);
        let attrs = Attributes::synthesize(FileType::Regular, 7, &stat, &config, 1);
        assert_eq!(attrs.perm(), 0o444 & !0o022);
    }

    #[test]
    fn test_setattr_classification() {
        assert!(SetAttr::new().is_empty());
        assert!(!SetAttr::new().size(0).changes_metadata());
        assert!(!SetAttr::new().size(0).is_empty());
        assert!(SetAttr::new().mode(0o644).changes_metadata());
        assert!(SetAttr::new().owner(1, 1).changes_metadata());
        assert!(SetAttr::new().flags(1).changes_metadata());
        let now = SystemTime::now();
        assert!(SetAttr::new().times(now, now).changes_metadata());
    }
}
