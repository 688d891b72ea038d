//! Shared test fixtures: a scriptable in-memory provider.
//!
//! `MockProvider` records every call it receives and can be told to fail
//! individual operations or to return short reads, which is what the
//! lifecycle and read-path tests need to observe.

#![allow(dead_code)]

use parking_lot::Mutex;
use sffs_core::{MountConfig, SharedFolderFs};
use sffs_provider::{
    HandleTable, ProviderClient, ProviderEntry, ProviderError, ProviderHandle, ProviderResult,
    StatSnapshot, S_IFIFO,
};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;
use std::time::SystemTime;

// =============================================================================
// Recorded calls
// =============================================================================

/// One provider call as seen by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Open(String),
    Close(u64),
    Read { handle: u64, offset: u64, len: usize },
    List(String),
    SetAttributes { path: String, mode: u32 },
    Stat(String),
}

impl Call {
    /// True for calls that could change host state.
    pub fn is_mutation(&self) -> bool {
        matches!(self, Call::SetAttributes { .. })
    }
}

/// Scripted outcome for the next `read_bytes` call.
#[derive(Debug, Clone, Copy)]
pub enum ReadStep {
    /// Return at most this many bytes.
    Short(usize),
    /// Fail with this errno.
    Fail(i32),
}

#[derive(Debug, Clone)]
struct Object {
    stat: StatSnapshot,
    data: Vec<u8>,
}

// =============================================================================
// MockProvider
// =============================================================================

/// In-memory provider with failure injection.
#[derive(Default)]
pub struct MockProvider {
    objects: Mutex<BTreeMap<String, Object>>,
    calls: Mutex<Vec<Call>>,
    handles: HandleTable<String>,
    open_errors: Mutex<HashMap<String, i32>>,
    close_error: Mutex<Option<i32>>,
    list_error: Mutex<Option<i32>>,
    stat_error: Mutex<Option<i32>>,
    set_attributes_error: Mutex<Option<i32>>,
    reads: Mutex<VecDeque<ReadStep>>,
    with_dots: bool,
}

impl MockProvider {
    /// A provider holding only the root directory.
    pub fn new() -> Self {
        let provider = Self::default();
        provider.objects.lock().insert(
            "/".to_string(),
            Object {
                stat: StatSnapshot::directory(),
                data: Vec::new(),
            },
        );
        provider
    }

    /// Makes listings start with `.` and `..` like a real host.
    #[must_use]
    pub fn with_dots(mut self) -> Self {
        self.with_dots = true;
        self
    }

    /// Adds a directory.
    #[must_use]
    pub fn dir(self, path: &str) -> Self {
        self.objects.lock().insert(
            path.to_string(),
            Object {
                stat: StatSnapshot::directory(),
                data: Vec::new(),
            },
        );
        self
    }

    /// Adds a regular file.
    #[must_use]
    pub fn file(self, path: &str, data: &[u8]) -> Self {
        self.objects.lock().insert(
            path.to_string(),
            Object {
                stat: StatSnapshot::regular(data.len() as u64),
                data: data.to_vec(),
            },
        );
        self
    }

    /// Adds a named pipe.
    #[must_use]
    pub fn fifo(self, path: &str) -> Self {
        self.objects.lock().insert(
            path.to_string(),
            Object {
                stat: StatSnapshot::new(S_IFIFO | 0o644, 0),
                data: Vec::new(),
            },
        );
        self
    }

    /// Replaces a file's contents after the fact.
    pub fn rewrite(&self, path: &str, data: &[u8]) {
        self.objects.lock().insert(
            path.to_string(),
            Object {
                stat: StatSnapshot::regular(data.len() as u64),
                data: data.to_vec(),
            },
        );
    }

    /// Removes an object after the fact.
    pub fn delete(&self, path: &str) {
        self.objects.lock().remove(path);
    }

    pub fn fail_open(&self, path: &str, errno: i32) {
        self.open_errors.lock().insert(path.to_string(), errno);
    }

    pub fn fail_close(&self, errno: Option<i32>) {
        *self.close_error.lock() = errno;
    }

    pub fn fail_list(&self, errno: Option<i32>) {
        *self.list_error.lock() = errno;
    }

    pub fn fail_stat(&self, errno: Option<i32>) {
        *self.stat_error.lock() = errno;
    }

    pub fn fail_set_attributes(&self, errno: Option<i32>) {
        *self.set_attributes_error.lock() = errno;
    }

    /// Queues scripted read outcomes, consumed one per `read_bytes` call.
    pub fn script_reads(&self, steps: &[ReadStep]) {
        self.reads.lock().extend(steps.iter().copied());
    }

    /// Every call received so far.
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    /// Forgets recorded calls.
    pub fn reset_calls(&self) {
        self.calls.lock().clear();
    }

    /// Number of recorded calls matching `pred`.
    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().iter().filter(|c| pred(c)).count()
    }

    /// Handles currently open.
    pub fn open_handles(&self) -> usize {
        self.handles.len()
    }

    fn record(&self, call: Call) {
        self.calls.lock().push(call);
    }

    fn parent_of(path: &str) -> &str {
        match path.rfind('/') {
            Some(0) | None => "/",
            Some(idx) => &path[..idx],
        }
    }
}

impl ProviderClient for MockProvider {
    fn open_path(&self, path: &str) -> ProviderResult<ProviderHandle> {
        self.record(Call::Open(path.to_string()));
        if let Some(errno) = self.open_errors.lock().get(path) {
            return Err(ProviderError::Host(*errno));
        }
        if !self.objects.lock().contains_key(path) {
            return Err(ProviderError::Host(libc::ENOENT));
        }
        Ok(ProviderHandle(self.handles.insert(path.to_string())))
    }

    fn close_handle(&self, handle: ProviderHandle) -> ProviderResult<()> {
        self.record(Call::Close(handle.raw()));
        self.handles.remove(handle.raw());
        match *self.close_error.lock() {
            Some(errno) => Err(ProviderError::Host(errno)),
            None => Ok(()),
        }
    }

    fn read_bytes(
        &self,
        handle: ProviderHandle,
        offset: u64,
        buf: &mut [u8],
        _is_kernel_buffer: bool,
    ) -> ProviderResult<usize> {
        self.record(Call::Read {
            handle: handle.raw(),
            offset,
            len: buf.len(),
        });
        let path = self
            .handles
            .get(handle.raw())
            .map(|p| p.clone())
            .ok_or(ProviderError::InvalidHandle(handle))?;

        let mut limit = buf.len();
        if let Some(step) = self.reads.lock().pop_front() {
            match step {
                ReadStep::Short(n) => limit = limit.min(n),
                ReadStep::Fail(errno) => return Err(ProviderError::Host(errno)),
            }
        }

        let objects = self.objects.lock();
        let data = &objects
            .get(&path)
            .ok_or(ProviderError::Host(libc::ENOENT))?
            .data;
        let start = usize::try_from(offset).unwrap_or(usize::MAX).min(data.len());
        let n = limit.min(data.len() - start);
        buf[..n].copy_from_slice(&data[start..start + n]);
        Ok(n)
    }

    fn list_directory(&self, path: &str) -> ProviderResult<Vec<ProviderEntry>> {
        self.record(Call::List(path.to_string()));
        if let Some(errno) = *self.list_error.lock() {
            return Err(ProviderError::Host(errno));
        }
        let objects = self.objects.lock();
        let dir = objects.get(path).ok_or(ProviderError::Host(libc::ENOENT))?;
        if !dir.stat.file_type().is_dir() {
            return Err(ProviderError::Host(libc::ENOTDIR));
        }

        let mut entries = Vec::new();
        if self.with_dots {
            entries.push(ProviderEntry::new(".", dir.stat));
            entries.push(ProviderEntry::new("..", StatSnapshot::directory()));
        }
        for (child, object) in objects.iter() {
            if child != "/" && Self::parent_of(child) == path {
                let name = child.rsplit('/').next().unwrap_or_default();
                entries.push(ProviderEntry::new(name, object.stat));
            }
        }
        Ok(entries)
    }

    fn set_attributes(
        &self,
        path: &str,
        mode: u32,
        _atime: Option<SystemTime>,
        _mtime: Option<SystemTime>,
        _ctime: Option<SystemTime>,
    ) -> ProviderResult<()> {
        self.record(Call::SetAttributes {
            path: path.to_string(),
            mode,
        });
        match *self.set_attributes_error.lock() {
            Some(errno) => Err(ProviderError::Host(errno)),
            None => Ok(()),
        }
    }

    fn stat_path(&self, path: &str) -> ProviderResult<StatSnapshot> {
        self.record(Call::Stat(path.to_string()));
        if let Some(errno) = *self.stat_error.lock() {
            return Err(ProviderError::Host(errno));
        }
        self.objects
            .lock()
            .get(path)
            .map(|o| o.stat)
            .ok_or(ProviderError::Host(libc::ENOENT))
    }
}

// =============================================================================
// Mount helpers
// =============================================================================

/// Mounts `provider` with `config`, keeping a handle on the provider.
pub fn mount_with(provider: MockProvider, config: MountConfig) -> (Arc<MockProvider>, SharedFolderFs) {
    let provider = Arc::new(provider);
    let fs = SharedFolderFs::mount(Arc::clone(&provider) as Arc<dyn ProviderClient>, config)
        .expect("mount failed");
    (provider, fs)
}

/// Mounts `provider` with the default configuration.
pub fn mount(provider: MockProvider) -> (Arc<MockProvider>, SharedFolderFs) {
    mount_with(provider, MountConfig::default())
}

/// The `/shared` tree used by the readdir scenarios.
pub fn shared_abc() -> MockProvider {
    MockProvider::new()
        .dir("/shared")
        .file("/shared/a", b"alpha")
        .file("/shared/b", b"bravo")
        .file("/shared/c", b"charlie")
}
