//! Node identity and the node table.
//!
//! A node is the adapter's per-object record: a stable id, the provider path
//! it stands for, its type, a reference count and the mutable state guarded
//! by the node lock. Parents are remembered by id rather than by pointer, so
//! a parent can be reclaimed while children live on; `..` then re-resolves
//! by path.

use crate::attr::AttrCache;
use crate::dirlist::DirListing;
use crate::path::NodePath;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::{Mutex, MutexGuard};
use sffs_provider::{FileType, ProviderHandle, StatSnapshot};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identifier of a node; reported as the file id and the dirent fileno.
pub type NodeId = u64;

/// The type of object a node represents.
pub type NodeKind = FileType;

/// Id of the shared folder root.
pub const ROOT_NODE_ID: NodeId = 2;

/// Id of the reserved well-known file.
pub const WELL_KNOWN_NODE_ID: NodeId = 3;

/// First id handed out for any other node.
pub const FIRST_DYNAMIC_ID: NodeId = 4;

/// Parent id meaning "not known; resolve by path".
const UNKNOWN_PARENT: NodeId = 0;

/// Paging object attached on the first successful open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MappingObject {
    /// File size when the object was created.
    pub size: u64,
}

/// Mutable per-node state, only reachable through [`Node::state`].
#[derive(Debug, Default)]
pub struct NodeState {
    pub(crate) handle: Option<ProviderHandle>,
    pub(crate) open_count: u32,
    pub(crate) mapping: Option<MappingObject>,
    pub(crate) attr: AttrCache,
    pub(crate) listing: Option<DirListing>,
}

impl NodeState {
    /// The open provider handle, if any.
    pub fn handle(&self) -> Option<ProviderHandle> {
        self.handle
    }

    /// Number of outstanding opens sharing the handle.
    pub fn open_count(&self) -> u32 {
        self.open_count
    }

    /// The paging object, once the node has been opened.
    pub fn mapping(&self) -> Option<MappingObject> {
        self.mapping
    }

    /// The cached directory listing, if one has been fetched.
    pub fn listing(&self) -> Option<&DirListing> {
        self.listing.as_ref()
    }

    /// The attribute cache.
    pub fn attr(&self) -> &AttrCache {
        &self.attr
    }
}

/// One tracked filesystem object.
#[derive(Debug)]
pub struct Node {
    id: NodeId,
    path: NodePath,
    kind: NodeKind,
    parent: AtomicU64,
    refs: AtomicU64,
    state: Mutex<NodeState>,
}

impl Node {
    /// Creates a node with no references, seeded with a stat snapshot.
    pub fn new(id: NodeId, path: NodePath, kind: NodeKind, parent: Option<NodeId>, stat: StatSnapshot) -> Self {
        Self {
            id,
            path,
            kind,
            parent: AtomicU64::new(parent.unwrap_or(UNKNOWN_PARENT)),
            refs: AtomicU64::new(0),
            state: Mutex::new(NodeState {
                attr: AttrCache::new(stat),
                ..NodeState::default()
            }),
        }
    }

    /// Creates the root node. It is its own parent and holds a permanent
    /// reference for the mount.
    pub fn root(stat: StatSnapshot) -> Self {
        let node = Self::new(ROOT_NODE_ID, NodePath::root(), FileType::Directory, Some(ROOT_NODE_ID), stat);
        node.refs.store(1, Ordering::Relaxed);
        node
    }

    /// The node id.
    #[inline]
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// The provider path this node stands for.
    #[inline]
    pub fn path(&self) -> &NodePath {
        &self.path
    }

    /// The object type, fixed at creation.
    #[inline]
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Returns true for the shared folder root.
    #[inline]
    pub fn is_root(&self) -> bool {
        self.id == ROOT_NODE_ID
    }

    /// The remembered parent id; `None` when it must be resolved by path.
    pub fn parent_id(&self) -> Option<NodeId> {
        match self.parent.load(Ordering::Acquire) {
            UNKNOWN_PARENT => None,
            id => Some(id),
        }
    }

    pub(crate) fn set_parent(&self, parent: NodeId) {
        self.parent.store(parent, Ordering::Release);
    }

    /// Current reference count.
    pub fn refs(&self) -> u64 {
        self.refs.load(Ordering::Acquire)
    }

    /// Takes a reference and returns the new count.
    pub(crate) fn inc_ref(&self) -> u64 {
        self.refs.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Drops a reference and returns the new count, or `None` if the count
    /// was already zero.
    pub(crate) fn dec_ref(&self) -> Option<u64> {
        self.refs
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .ok()
            .map(|old| old - 1)
    }

    /// Acquires the node lock.
    pub fn state(&self) -> MutexGuard<'_, NodeState> {
        self.state.lock()
    }

    /// Returns true while a provider handle is open.
    pub fn is_open(&self) -> bool {
        self.state.lock().handle.is_some()
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        write!(
            f,
            "node {} {} ({}) parent={} refs={} handle={} opens={} mapping={} listing={}",
            self.id,
            self.path,
            self.kind,
            self.parent_id().map_or_else(|| "?".to_string(), |p| p.to_string()),
            self.refs(),
            state.handle.map_or_else(|| "none".to_string(), |h| h.to_string()),
            state.open_count,
            if state.mapping.is_some() { "yes" } else { "no" },
            state
                .listing
                .as_ref()
                .map_or_else(|| "none".to_string(), |l| format!("{} entries", l.len())),
        )
    }
}

/// Thread-safe table of live nodes, indexed by id and by path.
///
/// The path index guarantees at most one live node per path, which is what
/// keeps node identity stable across lookups.
#[derive(Debug)]
pub struct NodeTable {
    nodes: DashMap<NodeId, Arc<Node>>,
    paths: DashMap<NodePath, NodeId>,
    next_id: AtomicU64,
}

impl NodeTable {
    /// Creates a table holding only the root node.
    pub fn with_root(root: Node) -> Self {
        let table = Self {
            nodes: DashMap::new(),
            paths: DashMap::new(),
            next_id: AtomicU64::new(FIRST_DYNAMIC_ID),
        };
        table.paths.insert(root.path().clone(), root.id());
        table.nodes.insert(root.id(), Arc::new(root));
        table
    }

    /// Returns the live node with `id`.
    pub fn get(&self, id: NodeId) -> Option<Arc<Node>> {
        self.nodes.get(&id).map(|n| Arc::clone(n.value()))
    }

    /// Returns true if `id` is live.
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Returns the id of the live node for `path`.
    pub fn id_for_path(&self, path: &NodePath) -> Option<NodeId> {
        self.paths.get(path).map(|id| *id)
    }

    /// Hands out a fresh id without creating a node.
    ///
    /// Ids are never reused; a reserved id may later be claimed through the
    /// `hint` of [`get_or_insert_with`](Self::get_or_insert_with).
    pub fn reserve_id(&self) -> NodeId {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Returns the live node for `path`, or creates one.
    ///
    /// A new node takes `hint` as its id when that id is free, otherwise a
    /// fresh one. The boolean is true when a node was created.
    pub fn get_or_insert_with(
        &self,
        path: &NodePath,
        hint: Option<NodeId>,
        make: impl FnOnce(NodeId) -> Node,
    ) -> (Arc<Node>, bool) {
        match self.paths.entry(path.clone()) {
            Entry::Occupied(entry) => {
                if let Some(node) = self.get(*entry.get()) {
                    return (node, false);
                }
                // Index pointed at a node that is gone; replace it.
                let node = self.mint(hint, make);
                *entry.into_ref() = node.id();
                (node, true)
            }
            Entry::Vacant(entry) => {
                let node = self.mint(hint, make);
                entry.insert(node.id());
                (node, true)
            }
        }
    }

    fn mint(&self, hint: Option<NodeId>, make: impl FnOnce(NodeId) -> Node) -> Arc<Node> {
        let id = match hint {
            Some(id) if id != 0 && !self.nodes.contains_key(&id) => id,
            _ => self.reserve_id(),
        };
        let node = Arc::new(make(id));
        self.nodes.insert(id, Arc::clone(&node));
        node
    }

    /// Drops the path index entry for `path` if it still points at `id`.
    ///
    /// The node itself stays reachable by id until reclaimed.
    pub fn unlink_path(&self, path: &NodePath, id: NodeId) {
        self.paths.remove_if(path, |_, current| *current == id);
    }

    /// Removes a node from both indexes.
    pub fn remove(&self, id: NodeId) -> Option<Arc<Node>> {
        let (_, node) = self.nodes.remove(&id)?;
        self.unlink_path(node.path(), id);
        Some(node)
    }

    /// Removes every node and returns them.
    pub fn drain(&self) -> Vec<Arc<Node>> {
        let ids: Vec<NodeId> = self.nodes.iter().map(|n| *n.key()).collect();
        let drained = ids.into_iter().filter_map(|id| self.remove(id)).collect();
        self.paths.clear();
        drained
    }

    /// Ids of all live nodes, unordered.
    pub fn ids(&self) -> Vec<NodeId> {
        self.nodes.iter().map(|n| *n.key()).collect()
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if no node is live.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
