//! Operations a read-only shared folder does not implement.
//!
//! Each reports `EOPNOTSUPP` without touching node state or the provider.

use crate::error::{FsError, FsResult};
use crate::filesystem::SharedFolderFs;
use crate::node::Node;
use sffs_provider::FileType;
use std::sync::Arc;
use tracing::trace;

#[allow(clippy::unused_self)]
impl SharedFolderFs {
    /// Writes file data.
    pub fn write(&self, node: &Node, offset: u64, data: &[u8]) -> FsResult<usize> {
        trace!(node = node.id(), offset, len = data.len(), "write");
        Err(FsError::NotSupported)
    }

    /// Creates a regular file.
    pub fn create(&self, dir: &Node, name: &str) -> FsResult<Arc<Node>> {
        trace!(dir = dir.id(), name, "create");
        Err(FsError::NotSupported)
    }

    /// Creates a special file.
    pub fn mknod(&self, dir: &Node, name: &str, kind: FileType) -> FsResult<Arc<Node>> {
        trace!(dir = dir.id(), name, %kind, "mknod");
        Err(FsError::NotSupported)
    }

    /// Removes a file.
    pub fn remove(&self, dir: &Node, node: &Node, name: &str) -> FsResult<()> {
        trace!(dir = dir.id(), node = node.id(), name, "remove");
        Err(FsError::NotSupported)
    }

    /// Renames an entry.
    pub fn rename(&self, from_dir: &Node, from: &str, to_dir: &Node, to: &str) -> FsResult<()> {
        trace!(from_dir = from_dir.id(), from, to_dir = to_dir.id(), to, "rename");
        Err(FsError::NotSupported)
    }

    /// Creates a hard link.
    pub fn link(&self, dir: &Node, node: &Node, name: &str) -> FsResult<()> {
        trace!(dir = dir.id(), node = node.id(), name, "link");
        Err(FsError::NotSupported)
    }

    /// Creates a symbolic link.
    pub fn symlink(&self, dir: &Node, name: &str, target: &str) -> FsResult<Arc<Node>> {
        trace!(dir = dir.id(), name, target, "symlink");
        Err(FsError::NotSupported)
    }

    /// Creates a directory.
    pub fn mkdir(&self, dir: &Node, name: &str) -> FsResult<Arc<Node>> {
        trace!(dir = dir.id(), name, "mkdir");
        Err(FsError::NotSupported)
    }

    /// Removes a directory.
    pub fn rmdir(&self, dir: &Node, node: &Node, name: &str) -> FsResult<()> {
        trace!(dir = dir.id(), node = node.id(), name, "rmdir");
        Err(FsError::NotSupported)
    }

    /// Flushes file data to the host.
    pub fn fsync(&self, node: &Node) -> FsResult<()> {
        trace!(node = node.id(), "fsync");
        Err(FsError::NotSupported)
    }

    /// Advisory record locking.
    pub fn advlock(&self, node: &Node, start: u64, len: u64) -> FsResult<()> {
        trace!(node = node.id(), start, len, "advlock");
        Err(FsError::NotSupported)
    }

    /// Reads an extended attribute.
    pub fn getextattr(&self, node: &Node, namespace: i32, name: &str) -> FsResult<Vec<u8>> {
        trace!(node = node.id(), namespace, name, "getextattr");
        Err(FsError::NotSupported)
    }

    /// Pages in mapped file data.
    pub fn getpages(&self, node: &Node, offset: u64, count: usize) -> FsResult<Vec<u8>> {
        trace!(node = node.id(), offset, count, "getpages");
        Err(FsError::NotSupported)
    }

    /// Pages out mapped file data.
    pub fn putpages(&self, node: &Node, offset: u64, data: &[u8]) -> FsResult<usize> {
        trace!(node = node.id(), offset, len = data.len(), "putpages");
        Err(FsError::NotSupported)
    }

    /// Exports an NFS-style file handle.
    pub fn vptofh(&self, node: &Node) -> FsResult<Vec<u8>> {
        trace!(node = node.id(), "vptofh");
        Err(FsError::NotSupported)
    }
}
