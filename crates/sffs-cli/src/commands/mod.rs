pub mod cat;
pub mod ls;
pub mod pathconf;
pub mod stat;
pub mod stats;

use std::sync::Arc;

use anyhow::{Context, Result};
use sffs_core::{ComponentName, Node, NodePath, SharedFolderFs};

/// Normalize a shared-folder path to ensure it starts with `/`.
/// This makes paths like `docs/a.txt` work the same as `/docs/a.txt`.
pub fn normalize_path(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

/// Walk `path` from the root one component at a time, the way the kernel
/// would, and return the referenced node for the last component.
pub fn resolve(fs: &SharedFolderFs, path: &str) -> Result<Arc<Node>> {
    let path = NodePath::new(path);
    let mut node = fs.root()?;
    let depth = path.depth();
    for (i, name) in path.components().enumerate() {
        let cn = if i + 1 == depth {
            ComponentName::lookup(name)
        } else {
            ComponentName::lookup(name).intermediate()
        };
        let next = fs
            .lookup(&node, &cn)
            .with_context(|| format!("Cannot resolve {path}"))?
            .node;
        fs.release(&node)?;
        node = next;
    }
    Ok(node)
}
