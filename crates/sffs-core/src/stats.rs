//! Per-mount activity counters.
//!
//! All counters are lock-free atomics; [`MountStats::snapshot`] takes a
//! consistent-enough copy for display.
//!
//! ```
//! use sffs_core::stats::{MountStats, ProviderOp};
//!
//! let stats = MountStats::new();
//! stats.record_provider_call(ProviderOp::Read);
//! stats.record_bytes_read(4096);
//! assert_eq!(stats.snapshot().provider_calls, 1);
//! ```

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Provider calls the adapter makes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderOp {
    /// `open_path`
    Open,
    /// `close_handle`
    Close,
    /// `read_bytes`
    Read,
    /// `list_directory`
    List,
    /// `set_attributes`
    SetAttributes,
    /// `stat_path`
    Stat,
}

/// Hit and miss counters for one cache.
#[derive(Debug, Default)]
pub struct CacheCounters {
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CacheCounters {
    /// Record a cache hit.
    #[inline]
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a cache miss.
    #[inline]
    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Total hits.
    pub fn hit_count(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Total misses.
    pub fn miss_count(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Hit rate as a fraction (0.0 to 1.0); 0.0 before any lookup.
    #[allow(clippy::cast_precision_loss)]
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hit_count();
        let total = hits + self.miss_count();
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }
}

/// Counters for one mount.
#[derive(Debug, Default)]
pub struct MountStats {
    opens: AtomicU64,
    closes: AtomicU64,
    reads: AtomicU64,
    listings: AtomicU64,
    set_attributes: AtomicU64,
    stats: AtomicU64,
    bytes_read: AtomicU64,
    close_errors: AtomicU64,
    attr: CacheCounters,
    names: CacheCounters,
}

impl MountStats {
    /// Creates zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one provider call.
    pub fn record_provider_call(&self, op: ProviderOp) {
        let counter = match op {
            ProviderOp::Open => &self.opens,
            ProviderOp::Close => &self.closes,
            ProviderOp::Read => &self.reads,
            ProviderOp::List => &self.listings,
            ProviderOp::SetAttributes => &self.set_attributes,
            ProviderOp::Stat => &self.stats,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Record bytes delivered to a reader.
    #[inline]
    pub fn record_bytes_read(&self, bytes: u64) {
        self.bytes_read.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Record a provider close failure.
    #[inline]
    pub fn record_close_error(&self) {
        self.close_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Attribute cache counters.
    pub fn attr_cache(&self) -> &CacheCounters {
        &self.attr
    }

    /// Name cache counters.
    pub fn name_cache(&self) -> &CacheCounters {
        &self.names
    }

    /// Number of directory listings fetched from the provider.
    pub fn listing_fetches(&self) -> u64 {
        self.listings.load(Ordering::Relaxed)
    }

    /// Number of provider stat calls.
    pub fn stat_calls(&self) -> u64 {
        self.stats.load(Ordering::Relaxed)
    }

    /// Takes a point-in-time copy of every counter.
    pub fn snapshot(&self) -> MountStatsSnapshot {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        let opens = load(&self.opens);
        let closes = load(&self.closes);
        let reads = load(&self.reads);
        let listings = load(&self.listings);
        let set_attributes = load(&self.set_attributes);
        let stats = load(&self.stats);
        MountStatsSnapshot {
            provider_calls: opens + closes + reads + listings + set_attributes + stats,
            opens,
            closes,
            reads,
            listings,
            set_attributes,
            stats,
            bytes_read: load(&self.bytes_read),
            close_errors: load(&self.close_errors),
            attr_hits: self.attr.hit_count(),
            attr_misses: self.attr.miss_count(),
            name_hits: self.names.hit_count(),
            name_misses: self.names.miss_count(),
        }
    }
}

/// Point-in-time copy of [`MountStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MountStatsSnapshot {
    /// Sum of all provider calls.
    pub provider_calls: u64,
    /// `open_path` calls.
    pub opens: u64,
    /// `close_handle` calls.
    pub closes: u64,
    /// `read_bytes` calls.
    pub reads: u64,
    /// `list_directory` calls.
    pub listings: u64,
    /// `set_attributes` calls.
    pub set_attributes: u64,
    /// `stat_path` calls.
    pub stats: u64,
    /// Bytes delivered to readers.
    pub bytes_read: u64,
    /// Provider close failures.
    pub close_errors: u64,
    /// Attribute cache hits.
    pub attr_hits: u64,
    /// Attribute cache misses.
    pub attr_misses: u64,
    /// Name cache hits.
    pub name_hits: u64,
    /// Name cache misses.
    pub name_misses: u64,
}
