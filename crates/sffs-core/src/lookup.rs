//! Name resolution: `(directory, name)` to a tracked node.
//!
//! Order of resolution:
//!
//! 1. the reserved well-known name, from any directory, is node 3;
//! 2. `..` goes through resolve-by-id on the remembered parent, falling back
//!    to the parent path when that node has been reclaimed;
//! 3. `.` is the directory itself, relocked as requested;
//! 4. the name cache;
//! 5. in [`LookupMode::Provider`], a provider stat of the child path.
//!
//! Every successful lookup takes a reference on the returned node.

use crate::config::{LookupMode, NAME_MAX, PATH_MAX};
use crate::error::{FsError, FsResult};
use crate::filesystem::{SharedFolderFs, synthetic_stat};
use crate::name_cache::NameLookup;
use crate::node::{Node, NodeId, ROOT_NODE_ID, WELL_KNOWN_NODE_ID};
use crate::path::NodePath;
use crate::request::{ComponentName, LockMode};
use crate::stats::ProviderOp;
use sffs_provider::{FileType, StatSnapshot};
use std::sync::Arc;
use tracing::{debug, trace};

/// A resolved name: the node, referenced, and the lock mode it is held with.
#[derive(Debug, Clone)]
pub struct Lookup {
    /// The resolved node.
    pub node: Arc<Node>,
    /// Lock mode granted on it.
    pub lock: LockMode,
}

impl SharedFolderFs {
    /// Resolves one name in `dir`.
    ///
    /// A name that does not resolve is `ENOENT`, except for the last
    /// component of a create or rename, which is `EROFS`.
    pub fn lookup(&self, dir: &Arc<Node>, cn: &ComponentName<'_>) -> FsResult<Lookup> {
        trace!(dir = dir.id(), name = cn.name, op = ?cn.op, "lookup");
        if !dir.kind().is_dir() {
            return Err(FsError::NotDirectory);
        }
        if cn.name.is_empty() || cn.name.contains('/') {
            return Err(FsError::InvalidArgument("name is not a single path component"));
        }
        if cn.name.len() > NAME_MAX {
            return Err(FsError::NameTooLong(cn.name.len()));
        }

        match self.resolve(dir, cn) {
            Ok(node) => {
                node.inc_ref();
                Ok(Lookup {
                    node,
                    lock: cn.lock,
                })
            }
            Err(e) if e.is_not_found() && cn.wants_to_create() => Err(FsError::ReadOnly),
            Err(e) => Err(e),
        }
    }

    fn resolve(&self, dir: &Arc<Node>, cn: &ComponentName<'_>) -> FsResult<Arc<Node>> {
        if self.config.well_known_name.as_deref() == Some(cn.name) {
            let node = self.resolve_well_known()?;
            if cn.make_entry {
                self.names.enter(dir.id(), cn.name, node.id());
            }
            return Ok(node);
        }
        match cn.name {
            ".." => return self.resolve_parent(dir),
            "." => {
                if cn.lock == LockMode::Exclusive {
                    trace!(dir = dir.id(), "upgrading lock on '.'");
                }
                return Ok(Arc::clone(dir));
            }
            _ => {}
        }

        match self.names.lookup(dir.id(), cn.name) {
            NameLookup::Hit(id) => {
                if let Some(node) = self.nodes.get(id) {
                    self.stats.name_cache().record_hit();
                    return Ok(node);
                }
                self.names.remove(dir.id(), cn.name);
                self.stats.name_cache().record_miss();
            }
            NameLookup::Negative => {
                self.stats.name_cache().record_hit();
                return Err(FsError::NotFound(dir.path().join(cn.name).to_string()));
            }
            NameLookup::Miss => self.stats.name_cache().record_miss(),
        }

        let result = match self.config.lookup_mode {
            LookupMode::Minimal => Err(FsError::NotFound(dir.path().join(cn.name).to_string())),
            LookupMode::Provider => self.resolve_by_stat(dir, cn.name),
        };
        match &result {
            Ok(node) if cn.make_entry => self.names.enter(dir.id(), cn.name, node.id()),
            Err(e) if e.is_not_found() && cn.make_entry && !cn.wants_to_create() => {
                self.names.enter_negative(dir.id(), cn.name);
            }
            _ => {}
        }
        result
    }

    /// The reserved node, minted on first use.
    fn resolve_well_known(&self) -> FsResult<Arc<Node>> {
        if let Some(node) = self.nodes.get(WELL_KNOWN_NODE_ID) {
            return Ok(node);
        }
        let name = self
            .config
            .well_known_name
            .as_deref()
            .ok_or(FsError::Stale(WELL_KNOWN_NODE_ID))?;
        let path = NodePath::root().join(name);
        self.stats.record_provider_call(ProviderOp::Stat);
        let stat = match self.provider.stat_path(path.as_str()) {
            Ok(stat) if stat.file_type().is_regular() => stat,
            Ok(_) | Err(_) => {
                debug!(path = %path, "well-known file has no regular host object");
                synthetic_stat(FileType::Regular)
            }
        };
        let (node, _) = self
            .nodes
            .get_or_insert_with(&path, Some(WELL_KNOWN_NODE_ID), |id| {
                Node::new(id, path.clone(), FileType::Regular, Some(ROOT_NODE_ID), stat)
            });
        Ok(node)
    }

    /// The parent of `dir`, or `dir` itself at the root.
    fn resolve_parent(&self, dir: &Arc<Node>) -> FsResult<Arc<Node>> {
        let Some(parent_path) = dir.path().parent() else {
            return Ok(Arc::clone(dir));
        };
        if let Some(id) = dir.parent_id()
            && let Some(parent) = self.nodes.get(id)
            && parent.path() == &parent_path
        {
            return Ok(parent);
        }

        // The parent was reclaimed; bring it back by path.
        debug!(dir = dir.id(), parent = %parent_path, "re-resolving reclaimed parent");
        let parent = self.node_for_path(&parent_path)?;
        dir.set_parent(parent.id());
        Ok(parent)
    }

    /// Live node for `path`, or a fresh one minted from a provider stat.
    fn node_for_path(&self, path: &NodePath) -> FsResult<Arc<Node>> {
        if let Some(id) = self.nodes.id_for_path(path)
            && let Some(node) = self.nodes.get(id)
        {
            return Ok(node);
        }
        self.stats.record_provider_call(ProviderOp::Stat);
        let stat = self.provider.stat_path(path.as_str())?;
        let parent = path.parent().and_then(|p| self.nodes.id_for_path(&p));
        let (node, _) = self.nodes.get_or_insert_with(path, None, |id| {
            Node::new(id, path.clone(), stat.file_type(), parent, stat)
        });
        Ok(node)
    }

    fn resolve_by_stat(&self, dir: &Arc<Node>, name: &str) -> FsResult<Arc<Node>> {
        let path = dir.path().join(name);
        if path.as_str().len() > PATH_MAX {
            return Err(FsError::NameTooLong(path.as_str().len()));
        }

        self.stats.record_provider_call(ProviderOp::Stat);
        let stat = self.provider.stat_path(path.as_str())?;
        let hint = dir
            .state()
            .listing()
            .and_then(|listing| listing.find(name))
            .map(|record| record.fileno);

        let node = self.mint(dir.id(), &path, hint, stat);
        if node.kind() == stat.file_type() {
            node.state().attr.store(stat);
            return Ok(node);
        }

        // The host object changed type under the same name; retire the old
        // identity from the path index and mint a new one.
        debug!(node = node.id(), path = %path, old = %node.kind(), new = %stat.file_type(), "type changed on host");
        self.names.purge(node.id());
        self.nodes.unlink_path(&path, node.id());
        Ok(self.mint(dir.id(), &path, None, stat))
    }

    fn mint(&self, parent: NodeId, path: &NodePath, hint: Option<NodeId>, stat: StatSnapshot) -> Arc<Node> {
        let (node, created) = self.nodes.get_or_insert_with(path, hint, |id| {
            Node::new(id, path.clone(), stat.file_type(), Some(parent), stat)
        });
        if created {
            debug!(node = node.id(), path = %path, kind = %node.kind(), "node created");
        }
        node
    }
}
