//! The shared-folder filesystem: vnode operations over a provider.
//!
//! [`SharedFolderFs`] is what the kernel dispatch layer calls into. Every
//! operation runs on the calling thread and blocks on provider round trips;
//! per-node state is serialized by the node lock and different nodes proceed
//! in parallel.
//!
//! | Operation | Behavior |
//! |-----------|----------|
//! | lookup | `.`, `..`, reserved name, then provider stat (see [`LookupMode`](crate::LookupMode)) |
//! | open/close | one shared provider handle per node, open-counted |
//! | getattr | TTL cache with last-known fallback; never fails |
//! | setattr | read-only except the empty request |
//! | read | bounded provider reads; partial reads succeed |
//! | readdir | segmented listing, byte-offset cursor |
//! | access | read-only policy, then mode bits |
//! | pathconf/ioctl | fixed ceilings / `ENOTTY` |
//! | mutations | `EOPNOTSUPP` |

use crate::attr::{Attributes, SetAttr};
use crate::config::MountConfig;
use crate::dirlist::{DirListing, DotIds, ReaddirReply};
use crate::error::{FsError, FsResult};
use crate::name_cache::NameCache;
use crate::node::{MappingObject, Node, NodeId, NodeTable, ROOT_NODE_ID, WELL_KNOWN_NODE_ID};
use crate::path::NodePath;
use crate::request::{AccessMode, Credentials, PathconfName, UioSegment};
use crate::stats::{MountStats, ProviderOp};
use parking_lot::Mutex;
use sffs_provider::{FileType, ProviderClient, StatSnapshot};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, error, info, trace, warn};

static NEXT_FSID: AtomicU64 = AtomicU64::new(1);

/// A provider close failure that was hidden from the caller of `close`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseError {
    /// Node whose handle failed to close.
    pub node: NodeId,
    /// Its provider path.
    pub path: NodePath,
    /// The provider's errno.
    pub errno: i32,
    /// The provider's message.
    pub message: String,
}

/// A mounted shared folder.
pub struct SharedFolderFs {
    pub(crate) provider: Arc<dyn ProviderClient>,
    pub(crate) config: MountConfig,
    fsid: u64,
    pub(crate) nodes: NodeTable,
    pub(crate) names: NameCache,
    pub(crate) stats: Arc<MountStats>,
    last_close_error: Mutex<Option<CloseError>>,
}

impl std::fmt::Debug for SharedFolderFs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedFolderFs")
            .field("fsid", &self.fsid)
            .field("config", &self.config)
            .field("nodes", &self.nodes.len())
            .field("names", &self.names.len())
            .finish_non_exhaustive()
    }
}

impl SharedFolderFs {
    /// Mounts the shared folder served by `provider`.
    ///
    /// The provider root must stat as a directory.
    pub fn mount(provider: Arc<dyn ProviderClient>, config: MountConfig) -> FsResult<Self> {
        config.validate()?;
        let stats = Arc::new(MountStats::new());
        stats.record_provider_call(ProviderOp::Stat);
        let root_stat = provider.stat_path(NodePath::root().as_str())?;
        if !root_stat.file_type().is_dir() {
            return Err(FsError::NotDirectory);
        }

        let fsid = NEXT_FSID.fetch_add(1, Ordering::Relaxed);
        info!(
            fsid,
            lookup_mode = ?config.lookup_mode,
            well_known = ?config.well_known_name,
            "shared folder mounted"
        );
        Ok(Self {
            provider,
            names: NameCache::new(config.negative_ttl),
            config,
            fsid,
            nodes: NodeTable::with_root(Node::root(root_stat)),
            stats,
            last_close_error: Mutex::new(None),
        })
    }

    /// The mount configuration.
    pub fn config(&self) -> &MountConfig {
        &self.config
    }

    /// Mount identifier reported as `fsid`.
    pub fn fsid(&self) -> u64 {
        self.fsid
    }

    /// Activity counters.
    pub fn stats(&self) -> &Arc<MountStats> {
        &self.stats
    }

    /// Number of live nodes, root included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Resolves a node by id and takes a reference on it.
    pub fn vget(&self, id: NodeId) -> FsResult<Arc<Node>> {
        let node = self.nodes.get(id).ok_or(FsError::Stale(id))?;
        node.inc_ref();
        Ok(node)
    }

    /// The root node, referenced.
    pub fn root(&self) -> FsResult<Arc<Node>> {
        self.vget(ROOT_NODE_ID)
    }

    /// Drops a reference taken by lookup or [`vget`](Self::vget).
    ///
    /// Returns true when this was the last reference, after running
    /// [`inactive`](Self::inactive).
    pub fn release(&self, node: &Node) -> FsResult<bool> {
        if node.is_root() && node.refs() <= 1 {
            warn!(node = node.id(), "release would drop the mount's root reference");
            return Ok(false);
        }
        match node.dec_ref() {
            Some(0) => {
                self.inactive(node)?;
                Ok(true)
            }
            Some(_) => Ok(false),
            None => {
                warn!(node = node.id(), "release without a reference");
                Ok(false)
            }
        }
    }

    /// Opens a provider handle for the node, or joins the one already open.
    pub fn open(&self, node: &Node) -> FsResult<()> {
        trace!(node = node.id(), path = %node.path(), "open");
        let mut state = node.state();
        if state.handle.is_some() {
            state.open_count += 1;
            return Ok(());
        }

        self.stats.record_provider_call(ProviderOp::Open);
        let handle = self.provider.open_path(node.path().as_str()).map_err(|e| {
            debug!(node = node.id(), error = %e, "provider open failed");
            FsError::from(e)
        })?;
        state.handle = Some(handle);
        state.open_count = 1;
        if state.mapping.is_none() {
            let size = state.attr.last_known().map_or(0, |s| s.size);
            state.mapping = Some(MappingObject { size });
        }
        debug!(node = node.id(), %handle, "opened");
        Ok(())
    }

    /// Closes one open of the node. Never fails.
    ///
    /// The listing is discarded and cached attributes invalidated on every
    /// close; the provider handle is closed with the last one. A provider
    /// close failure is logged and kept for [`take_close_error`](Self::take_close_error).
    pub fn close(&self, node: &Node) {
        trace!(node = node.id(), "close");
        let mut state = node.state();
        state.listing = None;
        state.attr.invalidate();

        if state.open_count > 1 {
            state.open_count -= 1;
            return;
        }
        state.open_count = 0;
        let Some(handle) = state.handle.take() else {
            return;
        };
        drop(state);

        self.stats.record_provider_call(ProviderOp::Close);
        if let Err(e) = self.provider.close_handle(handle) {
            warn!(node = node.id(), %handle, error = %e, "provider close failed");
            self.stats.record_close_error();
            *self.last_close_error.lock() = Some(CloseError {
                node: node.id(),
                path: node.path().clone(),
                errno: e.errno(),
                message: e.to_string(),
            });
        }
    }

    /// Returns and clears the most recent hidden close failure.
    pub fn take_close_error(&self) -> Option<CloseError> {
        self.last_close_error.lock().take()
    }

    /// Called when the last reference goes away. Nothing to do.
    pub fn inactive(&self, node: &Node) -> FsResult<()> {
        trace!(node = node.id(), "inactive");
        Ok(())
    }

    /// Releases an unreferenced node and removes it from the node table.
    ///
    /// Fails with `EBUSY` for the root, for a node that is still referenced
    /// and for a node whose provider handle is still open.
    pub fn reclaim(&self, node: &Node) -> FsResult<()> {
        trace!(node = node.id(), "reclaim");
        if node.is_root() || node.refs() > 0 {
            return Err(FsError::Busy(node.id()));
        }
        {
            let mut state = node.state();
            if let Some(handle) = state.handle {
                error!(node = node.id(), %handle, "reclaim of a node with an open provider handle");
                return Err(FsError::Busy(node.id()));
            }
            state.mapping = None;
            state.listing = None;
        }
        self.names.purge(node.id());
        self.nodes.remove(node.id());
        debug!(node = node.id(), path = %node.path(), "reclaimed");
        Ok(())
    }

    /// Returns the node's attributes.
    ///
    /// Served from the node's cache while it is fresh; otherwise refreshed
    /// from the provider, falling back to the last-known snapshot if the
    /// refresh fails.
    pub fn getattr(&self, node: &Node) -> Attributes {
        trace!(node = node.id(), "getattr");
        let stat = {
            let mut state = node.state();
            if let Some(stat) = state.attr.get_fresh(self.config.attr_ttl) {
                self.stats.attr_cache().record_hit();
                stat
            } else {
                self.stats.attr_cache().record_miss();
                self.stats.record_provider_call(ProviderOp::Stat);
                match self.provider.stat_path(node.path().as_str()) {
                    Ok(stat) => {
                        state.attr.store(stat);
                        stat
                    }
                    Err(e) => {
                        debug!(node = node.id(), error = %e, "attribute refresh failed, using last known");
                        state
                            .attr
                            .last_known()
                            .unwrap_or_else(|| synthetic_stat(node.kind()))
                    }
                }
            }
        };
        Attributes::synthesize(node.kind(), node.id(), &stat, &self.config, self.fsid)
    }

    /// Applies attribute changes, which this read-only filesystem refuses.
    ///
    /// Only a request with no changes reaches the provider.
    pub fn setattr(&self, node: &Node, changes: &SetAttr) -> FsResult<()> {
        trace!(node = node.id(), ?changes, "setattr");
        let mut state = node.state();
        state.attr.invalidate();

        if changes.changes_metadata() {
            return Err(FsError::ReadOnly);
        }
        if changes.size.is_some() {
            return match node.kind() {
                FileType::Directory => Err(FsError::IsDirectory),
                FileType::Regular | FileType::Symlink => Err(FsError::ReadOnly),
                _ => Ok(()),
            };
        }
        drop(state);

        self.stats.record_provider_call(ProviderOp::SetAttributes);
        self.provider
            .set_attributes(node.path().as_str(), node.kind().type_bits(), None, None, None)?;
        Ok(())
    }

    /// Checks whether `cred` may access the node with `mode`.
    pub fn access(&self, node: &Node, mode: AccessMode, cred: &Credentials) -> FsResult<()> {
        trace!(node = node.id(), mode = mode.bits(), uid = cred.uid, "access");
        if mode.contains(AccessMode::WRITE)
            && self.config.read_only
            && matches!(
                node.kind(),
                FileType::Directory | FileType::Symlink | FileType::Regular
            )
        {
            return Err(FsError::ReadOnly);
        }

        let attrs = self.getattr(node);
        let perm = attrs.perm();
        if cred.uid == 0 {
            if mode.contains(AccessMode::EXEC) && !node.kind().is_dir() && perm & 0o111 == 0 {
                return Err(FsError::PermissionDenied);
            }
            return Ok(());
        }

        let granted = if cred.uid == attrs.uid {
            (perm >> 6) & 0o7
        } else if cred.in_group(attrs.gid) {
            (perm >> 3) & 0o7
        } else {
            perm & 0o7
        };
        if granted & mode.bits() == mode.bits() {
            Ok(())
        } else {
            Err(FsError::PermissionDenied)
        }
    }

    /// Reads file data at `offset` into `buf`.
    ///
    /// Issues provider reads of at most `max_transfer` bytes until `buf` is
    /// full, the provider returns zero bytes, or a call fails. Any progress
    /// makes the result a success.
    pub fn read(&self, node: &Node, offset: u64, buf: &mut [u8], segment: UioSegment) -> FsResult<usize> {
        trace!(node = node.id(), offset, len = buf.len(), "read");
        match node.kind() {
            FileType::Directory => return Err(FsError::IsDirectory),
            FileType::Regular => {}
            _ => return Err(FsError::InvalidArgument("read of a non-regular file")),
        }
        if buf.is_empty() {
            return Ok(0);
        }
        let handle = node.state().handle.ok_or(FsError::NoHandle(node.id()))?;

        let mut done = 0usize;
        let outcome = loop {
            let want = (buf.len() - done).min(self.config.max_transfer);
            self.stats.record_provider_call(ProviderOp::Read);
            match self.provider.read_bytes(
                handle,
                offset + done as u64,
                &mut buf[done..done + want],
                segment.is_kernel(),
            ) {
                Ok(0) => break Ok(()),
                Ok(n) => {
                    done += n.min(want);
                    if done == buf.len() {
                        break Ok(());
                    }
                }
                Err(e) => break Err(e),
            }
        };
        self.stats.record_bytes_read(done as u64);

        match outcome {
            Ok(()) => Ok(done),
            Err(e) if done > 0 => {
                debug!(node = node.id(), done, error = %e, "partial read");
                Ok(done)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Copies directory entries starting at `cursor` into `buf`.
    ///
    /// The first call after open enumerates the directory once through the
    /// provider; later calls page through that snapshot until close. A buffer
    /// too small for the next record fails with `EINVAL` instead of returning
    /// zero bytes.
    pub fn readdir(&self, dir: &Node, cursor: u64, buf: &mut [u8]) -> FsResult<ReaddirReply> {
        trace!(node = dir.id(), cursor, len = buf.len(), "readdir");
        if !dir.kind().is_dir() {
            return Err(FsError::NotDirectory);
        }
        let mut state = dir.state();
        if state.listing.is_none() {
            state.listing = Some(self.fetch_listing(dir)?);
        }
        let dots = DotIds {
            dot: dir.id(),
            dotdot: self.parent_fileno(dir),
        };
        match &state.listing {
            Some(listing) => listing.read(cursor, buf, dots),
            None => Err(FsError::InvalidArgument("directory listing unavailable")),
        }
    }

    fn fetch_listing(&self, dir: &Node) -> FsResult<DirListing> {
        self.stats.record_provider_call(ProviderOp::List);
        let entries = self.provider.list_directory(dir.path().as_str())?;
        let well_known = self.config.well_known_name.as_deref();
        let listing = DirListing::build(entries, self.config.segment_size, |name| {
            if well_known == Some(name) {
                return WELL_KNOWN_NODE_ID;
            }
            self.nodes
                .id_for_path(&dir.path().join(name))
                .unwrap_or_else(|| self.nodes.reserve_id())
        });
        debug!(
            node = dir.id(),
            entries = listing.len(),
            segments = listing.segment_count(),
            "directory listing fetched"
        );
        Ok(listing)
    }

    /// Id reported for `..` in a listing of `dir`.
    fn parent_fileno(&self, dir: &Node) -> NodeId {
        if dir.is_root() {
            return dir.id();
        }
        if let Some(parent) = dir.parent_id()
            && self.nodes.contains(parent)
        {
            return parent;
        }
        dir.path()
            .parent()
            .and_then(|p| self.nodes.id_for_path(&p))
            .unwrap_or(dir.id())
    }

    /// Returns the fixed value of a configurable limit.
    pub fn pathconf(&self, node: &Node, name: PathconfName) -> FsResult<u64> {
        trace!(node = node.id(), ?name, "pathconf");
        name.value()
            .ok_or(FsError::InvalidArgument("unknown pathconf name"))
    }

    /// Device control; no commands exist.
    pub fn ioctl(&self, node: &Node, command: u64) -> FsResult<()> {
        trace!(node = node.id(), command, "ioctl");
        Err(FsError::NotTty)
    }

    /// One-line summary of a node for diagnostics.
    pub fn describe(&self, node: &Node) -> String {
        node.to_string()
    }

    /// Closes every open provider handle and forgets all nodes.
    ///
    /// Returns the number of handles closed. Close failures are logged and
    /// otherwise ignored.
    pub fn unmount(&self) -> usize {
        let mut closed = 0;
        for node in self.nodes.drain() {
            let handle = {
                let mut state = node.state();
                state.listing = None;
                state.mapping = None;
                state.open_count = 0;
                state.handle.take()
            };
            if let Some(handle) = handle {
                self.stats.record_provider_call(ProviderOp::Close);
                match self.provider.close_handle(handle) {
                    Ok(()) => closed += 1,
                    Err(e) => {
                        warn!(node = node.id(), %handle, error = %e, "close during unmount failed");
                        self.stats.record_close_error();
                    }
                }
            }
        }
        self.names.clear();
        info!(fsid = self.fsid, closed, "shared folder unmounted");
        closed
    }
}

/// Stand-in snapshot for a node that has never been stat'ed successfully.
pub(crate) fn synthetic_stat(kind: FileType) -> StatSnapshot {
    if kind.is_dir() {
        StatSnapshot::directory()
    } else {
        StatSnapshot::new(kind.type_bits() | 0o644, 0)
    }
}
