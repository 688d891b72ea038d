//! Thread-safe table of open host handles.
//!
//! Handles are keyed by auto-incrementing `u64` ids starting at 1; 0 is never
//! handed out so it can stand for "no handle" on the wire.

use dashmap::mapref::entry::Entry;
use dashmap::mapref::one::Ref;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Concurrent map from handle id to handle value.
///
/// # Example
///
/// ```
/// use sffs_provider::HandleTable;
///
/// let table: HandleTable<String> = HandleTable::new();
///
/// let id1 = table.insert("file1".to_string());
/// let id2 = table.insert("file2".to_string());
///
/// assert_ne!(id1, id2);
/// assert_eq!(table.len(), 2);
/// assert_eq!(table.remove(id1), Some("file1".to_string()));
/// ```
#[derive(Debug)]
pub struct HandleTable<V> {
    handles: DashMap<u64, V>,
    next_id: AtomicU64,
}

impl<V> HandleTable<V> {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self {
            handles: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Inserts a value under a freshly generated id and returns the id.
    pub fn insert(&self, value: V) -> u64 {
        let mut value = Some(value);
        loop {
            let id = self.next_id.fetch_add(1, Ordering::Relaxed);
            if id == 0 {
                continue;
            }
            if let Entry::Vacant(entry) = self.handles.entry(id)
                && let Some(value) = value.take()
            {
                entry.insert(value);
                return id;
            }
        }
    }

    /// Returns a reference to the value for `id`.
    pub fn get(&self, id: u64) -> Option<Ref<'_, u64, V>> {
        self.handles.get(&id)
    }

    /// Removes and returns the value for `id`.
    pub fn remove(&self, id: u64) -> Option<V> {
        self.handles.remove(&id).map(|(_, v)| v)
    }

    /// Returns true if `id` is present.
    pub fn contains(&self, id: u64) -> bool {
        self.handles.contains_key(&id)
    }

    /// Number of open handles.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Returns true if no handle is open.
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Drops every handle.
    pub fn clear(&self) {
        self.handles.clear();
    }
}

impl<V> Default for HandleTable<V> {
    fn default() -> Self {
        Self::new()
    }
}
