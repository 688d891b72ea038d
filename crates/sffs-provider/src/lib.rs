//! Shared-folder provider interface.
//!
//! The provider is the stateless-per-call facade that performs cross-boundary
//! I/O against the host: opening paths, reading bytes, listing directories,
//! stat'ing and changing attributes. The filesystem adapter in `sffs-core`
//! consumes it exclusively through the [`ProviderClient`] trait.
//!
//! # Components
//!
//! - [`ProviderClient`] - The operations the adapter issues against the host
//! - [`StatSnapshot`], [`FileType`], [`ProviderEntry`] - Data returned by the host
//! - [`ProviderError`] - Host-side failures, convertible to POSIX errno values
//! - [`HandleTable`] - Thread-safe table of open host handles
//! - [`LocalProvider`] - A provider serving a host directory through `std::fs`
//!
//! # Example
//!
//! ```no_run
//! use sffs_provider::{LocalProvider, ProviderClient};
//!
//! let provider = LocalProvider::new("/srv/shared")?;
//! for entry in provider.list_directory("/")? {
//!     println!("{} ({} bytes)", entry.name, entry.stat.size);
//! }
//! # Ok::<(), sffs_provider::ProviderError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod client;
mod error;
mod handle_table;
#[cfg(unix)]
mod local;
mod types;

pub use client::ProviderClient;
pub use error::{io_error_to_errno, ProviderError, ProviderResult};
pub use handle_table::HandleTable;
#[cfg(unix)]
pub use local::LocalProvider;
pub use types::{
    FileType, ProviderEntry, ProviderHandle, StatSnapshot, S_IFBLK, S_IFCHR, S_IFDIR, S_IFIFO,
    S_IFLNK, S_IFMT, S_IFREG, S_IFSOCK,
};
