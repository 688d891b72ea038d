//! Name cache: `(directory, name)` to node id.
//!
//! Positive entries remember which node a name resolved to; negative entries
//! remember that it did not resolve, for a short TTL. Entries are only hints:
//! a positive entry whose node has been reclaimed is treated as a miss.

use crate::node::NodeId;
use dashmap::DashMap;
use std::time::{Duration, Instant};

/// Size above which inserting a negative entry sweeps expired negatives.
const CLEANUP_THRESHOLD: usize = 10_000;

#[derive(Debug, Clone, Copy)]
enum NameEntry {
    Positive(NodeId),
    Negative { expires: Instant },
}

/// Outcome of a name cache probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameLookup {
    /// The name resolved to this node.
    Hit(NodeId),
    /// The name is known not to exist.
    Negative,
    /// Nothing cached.
    Miss,
}

/// Thread-safe name cache.
#[derive(Debug)]
pub struct NameCache {
    entries: DashMap<(NodeId, String), NameEntry>,
    negative_ttl: Duration,
    cleanup_threshold: usize,
}

impl NameCache {
    /// Creates an empty cache.
    pub fn new(negative_ttl: Duration) -> Self {
        Self::with_threshold(negative_ttl, CLEANUP_THRESHOLD)
    }

    /// Creates an empty cache with a custom cleanup threshold.
    pub fn with_threshold(negative_ttl: Duration, cleanup_threshold: usize) -> Self {
        Self {
            entries: DashMap::new(),
            negative_ttl,
            cleanup_threshold,
        }
    }

    /// Probes the cache. Expired negative entries are dropped.
    pub fn lookup(&self, dir: NodeId, name: &str) -> NameLookup {
        let key = (dir, name.to_string());
        let found = self.entries.get(&key).map(|e| *e.value());
        match found {
            Some(NameEntry::Positive(id)) => NameLookup::Hit(id),
            Some(NameEntry::Negative { expires }) if Instant::now() < expires => NameLookup::Negative,
            Some(NameEntry::Negative { .. }) => {
                self.entries
                    .remove_if(&key, |_, e| matches!(e, NameEntry::Negative { .. }));
                NameLookup::Miss
            }
            None => NameLookup::Miss,
        }
    }

    /// Remembers that `name` in `dir` resolved to `node`.
    pub fn enter(&self, dir: NodeId, name: &str, node: NodeId) {
        self.entries
            .insert((dir, name.to_string()), NameEntry::Positive(node));
    }

    /// Remembers that `name` in `dir` does not exist.
    pub fn enter_negative(&self, dir: NodeId, name: &str) {
        if self.negative_ttl.is_zero() {
            return;
        }
        self.entries.insert(
            (dir, name.to_string()),
            NameEntry::Negative {
                expires: Instant::now() + self.negative_ttl,
            },
        );
        if self.entries.len() > self.cleanup_threshold {
            self.cleanup_expired();
        }
    }

    /// Removes every expired negative entry.
    pub fn cleanup_expired(&self) {
        let now = Instant::now();
        self.entries
            .retain(|_, entry| !matches!(entry, NameEntry::Negative { expires } if *expires <= now));
    }

    /// Forgets one name.
    pub fn remove(&self, dir: NodeId, name: &str) {
        self.entries.remove(&(dir, name.to_string()));
    }

    /// Forgets every entry naming `node` or listed under it.
    pub fn purge(&self, node: NodeId) {
        self.entries.retain(|(dir, _), entry| {
            *dir != node && !matches!(entry, NameEntry::Positive(id) if *id == node)
        });
    }

    /// Drops everything.
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Number of cached names, positive and negative.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
