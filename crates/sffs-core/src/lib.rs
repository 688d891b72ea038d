//! Guest-side adapter that exposes a host shared folder as a filesystem.
//!
//! This crate sits between the kernel's vnode dispatch and a
//! [`ProviderClient`](sffs_provider::ProviderClient) that talks to the host.
//! It owns everything the host does not: stable node identities, the name
//! cache, per-node attribute caches and the segmented directory listings
//! behind the readdir cursor.
//!
//! # Architecture
//!
//! - [`SharedFolderFs`]: the mount and its vnode operations
//! - [`NodeTable`] and [`Node`]: identity, references, per-node state
//! - [`DirListing`]: listing snapshot and byte-offset readdir cursor
//! - [`AttrCache`] and [`Attributes`]: TTL attribute cache and reported
//!   attributes
//! - [`NameCache`]: positive and negative `(directory, name)` cache
//! - [`MountStats`]: lock-free activity counters
//!
//! # Example
//!
//! ```no_run
//! use sffs_core::{ComponentName, MountConfig, SharedFolderFs, UioSegment};
//! use sffs_provider::LocalProvider;
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let provider = Arc::new(LocalProvider::new("/srv/shared")?);
//! let fs = SharedFolderFs::mount(provider, MountConfig::default())?;
//!
//! let root = fs.root()?;
//! let file = fs.lookup(&root, &ComponentName::lookup("notes.txt"))?.node;
//! fs.open(&file)?;
//! let mut buf = vec![0u8; 4096];
//! let n = fs.read(&file, 0, &mut buf, UioSegment::User)?;
//! fs.close(&file);
//! println!("{}", String::from_utf8_lossy(&buf[..n]));
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod attr;
pub mod config;
pub mod dirent;
pub mod dirlist;
pub mod error;
pub mod filesystem;
pub mod lookup;
pub mod name_cache;
pub mod node;
pub mod path;
pub mod request;
pub mod stats;
mod unsupported;

pub use attr::{AttrCache, Attributes, SetAttr};
pub use config::{LookupMode, MountConfig};
pub use dirent::Dirent;
pub use dirlist::{DirListing, ReaddirReply};
pub use error::{ErrorClass, FsError, FsResult, ToErrno};
pub use filesystem::{CloseError, SharedFolderFs};
pub use lookup::Lookup;
pub use name_cache::NameCache;
pub use node::{
    FIRST_DYNAMIC_ID, MappingObject, Node, NodeId, NodeKind, NodeTable, ROOT_NODE_ID,
    WELL_KNOWN_NODE_ID,
};
pub use path::NodePath;
pub use request::{
    AccessMode, ComponentName, Credentials, LockMode, NameOp, PathconfName, UioSegment,
};
pub use stats::{MountStats, MountStatsSnapshot};
