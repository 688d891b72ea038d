//! A provider that serves a host directory through `std::fs`.
//!
//! This stands in for the hypervisor transport: the "host" is a directory on
//! the local machine, and every provider call becomes the equivalent
//! filesystem call below that directory. Listings carry `.` and `..` first,
//! the way the host service reports them.

use crate::client::ProviderClient;
use crate::error::{ProviderError, ProviderResult};
use crate::handle_table::HandleTable;
use crate::types::{ProviderEntry, ProviderHandle, StatSnapshot};
use filetime::FileTime;
use std::fs::{self, File, Metadata};
use std::os::unix::fs::{FileExt, MetadataExt, PermissionsExt};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, trace, warn};

/// Provider backed by a directory on the local filesystem.
#[derive(Debug)]
pub struct LocalProvider {
    root: PathBuf,
    handles: HandleTable<File>,
}

impl LocalProvider {
    /// Creates a provider rooted at `root`, which must be an existing directory.
    pub fn new(root: impl AsRef<Path>) -> ProviderResult<Self> {
        let display = root.as_ref().display().to_string();
        let root = fs::canonicalize(root.as_ref()).map_err(|e| ProviderError::io(&display, e))?;
        let meta = fs::metadata(&root).map_err(|e| ProviderError::io(&display, e))?;
        if !meta.is_dir() {
            return Err(ProviderError::Host(libc::ENOTDIR));
        }
        debug!(root = %root.display(), "local provider ready");
        Ok(Self {
            root,
            handles: HandleTable::new(),
        })
    }

    /// The host directory backing the shared folder.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Number of handles currently open on the host.
    pub fn open_handles(&self) -> usize {
        self.handles.len()
    }

    /// Maps a provider path onto the host, refusing `..` components.
    fn host_path(&self, path: &str) -> ProviderResult<PathBuf> {
        let mut host = self.root.clone();
        for component in path.split('/') {
            match component {
                "" | "." => {}
                ".." => return Err(ProviderError::PathEscape(path.to_string())),
                name => host.push(name),
            }
        }
        Ok(host)
    }

    fn stat_host(&self, path: &str, host: &Path) -> ProviderResult<StatSnapshot> {
        fs::symlink_metadata(host)
            .map(|meta| snapshot_from_metadata(&meta))
            .map_err(|e| ProviderError::io(path, e))
    }
}

impl ProviderClient for LocalProvider {
    fn open_path(&self, path: &str) -> ProviderResult<ProviderHandle> {
        let host = self.host_path(path)?;
        let file = File::open(&host).map_err(|e| ProviderError::io(path, e))?;
        let handle = ProviderHandle(self.handles.insert(file));
        trace!(path, %handle, "opened");
        Ok(handle)
    }

    fn close_handle(&self, handle: ProviderHandle) -> ProviderResult<()> {
        match self.handles.remove(handle.raw()) {
            Some(_file) => {
                trace!(%handle, "closed");
                Ok(())
            }
            None => Err(ProviderError::InvalidHandle(handle)),
        }
    }

    fn read_bytes(
        &self,
        handle: ProviderHandle,
        offset: u64,
        buf: &mut [u8],
        _is_kernel_buffer: bool,
    ) -> ProviderResult<usize> {
        let file = self
            .handles
            .get(handle.raw())
            .ok_or(ProviderError::InvalidHandle(handle))?;
        file.read_at(buf, offset)
            .map_err(|e| ProviderError::io(handle.to_string(), e))
    }

    fn list_directory(&self, path: &str) -> ProviderResult<Vec<ProviderEntry>> {
        let host = self.host_path(path)?;
        let dot = self.stat_host(path, &host)?;
        let dotdot = match host.parent() {
            Some(parent) if host != self.root => self.stat_host(path, parent)?,
            _ => dot,
        };

        let mut children = Vec::new();
        for entry in fs::read_dir(&host).map_err(|e| ProviderError::io(path, e))? {
            let entry = entry.map_err(|e| ProviderError::io(path, e))?;
            // A lossy name would be listed but never resolve.
            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(raw) => {
                    warn!(path, name = ?raw, "skipping non-UTF-8 host name");
                    continue;
                }
            };
            let meta = entry
                .metadata()
                .map_err(|e| ProviderError::io(path, e))?;
            children.push(ProviderEntry::new(name, snapshot_from_metadata(&meta)));
        }
        // Host directory order is arbitrary; sort so repeated listings agree.
        children.sort_by(|a, b| a.name.cmp(&b.name));

        let mut entries = Vec::with_capacity(children.len() + 2);
        entries.push(ProviderEntry::new(".", dot));
        entries.push(ProviderEntry::new("..", dotdot));
        entries.extend(children);
        trace!(path, count = entries.len(), "listed");
        Ok(entries)
    }

    fn set_attributes(
        &self,
        path: &str,
        mode: u32,
        atime: Option<SystemTime>,
        mtime: Option<SystemTime>,
        _ctime: Option<SystemTime>,
    ) -> ProviderResult<()> {
        let host = self.host_path(path)?;
        let meta = fs::symlink_metadata(&host).map_err(|e| ProviderError::io(path, e))?;

        let perm = mode & 0o7777;
        if perm != 0 {
            fs::set_permissions(&host, fs::Permissions::from_mode(perm))
                .map_err(|e| ProviderError::io(path, e))?;
        }
        if atime.is_some() || mtime.is_some() {
            let atime = atime.map_or_else(
                || FileTime::from_last_access_time(&meta),
                FileTime::from_system_time,
            );
            let mtime = mtime.map_or_else(
                || FileTime::from_last_modification_time(&meta),
                FileTime::from_system_time,
            );
            filetime::set_file_times(&host, atime, mtime)
                .map_err(|e| ProviderError::io(path, e))?;
        }
        Ok(())
    }

    fn stat_path(&self, path: &str) -> ProviderResult<StatSnapshot> {
        let host = self.host_path(path)?;
        self.stat_host(path, &host)
    }
}

fn snapshot_from_metadata(meta: &Metadata) -> StatSnapshot {
    StatSnapshot {
        mode: meta.mode(),
        size: meta.size(),
        alloc: meta.blocks() * 512,
        atime: meta.accessed().ok(),
        mtime: meta.modified().ok(),
        ctime: epoch_time(meta.ctime(), meta.ctime_nsec()),
    }
}

fn epoch_time(secs: i64, nsecs: i64) -> Option<SystemTime> {
    let secs = u64::try_from(secs).ok()?;
    let nsecs = u32::try_from(nsecs).ok()?;
    UNIX_EPOCH.checked_add(Duration::new(secs, nsecs))
}
