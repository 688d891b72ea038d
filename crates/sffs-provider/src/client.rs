//! The provider client interface consumed by the filesystem adapter.

use crate::error::ProviderResult;
use crate::types::{ProviderEntry, ProviderHandle, StatSnapshot};
use std::time::SystemTime;

/// Stateless-per-call facade to the host side of a shared folder.
///
/// Every call is a blocking request/response round trip. Paths are
/// provider-relative and `/`-separated, with `/` naming the shared folder
/// root. Implementations must be safe to call from many threads at once; the
/// adapter serializes calls per node, not globally.
pub trait ProviderClient: Send + Sync {
    /// Opens the object at `path` and returns a host handle for it.
    fn open_path(&self, path: &str) -> ProviderResult<ProviderHandle>;

    /// Closes a handle returned by [`open_path`](Self::open_path).
    ///
    /// Best effort: the adapter never propagates a failure from here.
    fn close_handle(&self, handle: ProviderHandle) -> ProviderResult<()>;

    /// Reads up to `buf.len()` bytes at `offset` into `buf`.
    ///
    /// Returns the number of bytes read; zero means end of file.
    /// `is_kernel_buffer` tells the transport whether `buf` is kernel memory
    /// (it may then skip the user-copy path).
    fn read_bytes(
        &self,
        handle: ProviderHandle,
        offset: u64,
        buf: &mut [u8],
        is_kernel_buffer: bool,
    ) -> ProviderResult<usize>;

    /// Enumerates the directory at `path` in host order.
    fn list_directory(&self, path: &str) -> ProviderResult<Vec<ProviderEntry>>;

    /// Changes attributes of the object at `path`.
    ///
    /// `mode` carries the object's type bits plus the permission bits to set;
    /// permission bits of zero mean "leave the mode alone". Timestamps set to
    /// `None` are left unchanged.
    fn set_attributes(
        &self,
        path: &str,
        mode: u32,
        atime: Option<SystemTime>,
        mtime: Option<SystemTime>,
        ctime: Option<SystemTime>,
    ) -> ProviderResult<()>;

    /// Returns a fresh stat snapshot for `path`.
    fn stat_path(&self, path: &str) -> ProviderResult<StatSnapshot>;
}
