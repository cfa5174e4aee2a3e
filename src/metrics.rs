//! Lookup and persistence counters.
//!
//! Store transport errors and plain misses take the same path through a lookup; they are
//! counted separately here so "cache down" can be told apart from "cache cold".

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Point-in-time copy of [`CacheMetrics`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Lookups served from the store.
    pub hits: u64,
    /// Lookups that found no entry.
    pub misses: u64,
    /// Lookups whose store read failed.
    pub store_errors: u64,
    /// Lookups whose stored bytes did not decode.
    pub decode_errors: u64,
    /// Lookups that refreshed because the entry outlived its TTL.
    pub expired: u64,
    /// Lookups that refreshed because the cached-data validator said `Invalid`.
    pub invalidated: u64,
    /// Lookups that refreshed without persisting because the validator said `Unstable`.
    pub unstable: u64,
    /// Entries written after a refresh.
    pub persisted: u64,
    /// Entries deleted because fresh data failed validation.
    pub pruned: u64,
    /// Writes or deletes the store rejected.
    pub persist_failures: u64,
}

impl CacheStats {
    /// Fraction of lookups (0.0 to 1.0) served from the store.
    pub fn hit_rate(&self) -> f64 {
        let total = self.lookups();
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// Total number of lookups recorded.
    pub fn lookups(&self) -> u64 {
        self.hits
            + self.misses
            + self.store_errors
            + self.decode_errors
            + self.expired
            + self.invalidated
            + self.unstable
    }
}

/// Thread-safe counters shared between a cache and its detached persistence tasks.
#[derive(Debug, Default)]
pub struct CacheMetrics {
    hits: AtomicU64,
    misses: AtomicU64,
    store_errors: AtomicU64,
    decode_errors: AtomicU64,
    expired: AtomicU64,
    invalidated: AtomicU64,
    unstable: AtomicU64,
    persisted: AtomicU64,
    pruned: AtomicU64,
    persist_failures: AtomicU64,
}

impl CacheMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_store_error(&self) {
        self.store_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_decode_error(&self) {
        self.decode_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_expired(&self) {
        self.expired.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_invalidated(&self) {
        self.invalidated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_unstable(&self) {
        self.unstable.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_persisted(&self) {
        self.persisted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_pruned(&self) {
        self.pruned.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_persist_failure(&self) {
        self.persist_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            store_errors: self.store_errors.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            expired: self.expired.load(Ordering::Relaxed),
            invalidated: self.invalidated.load(Ordering::Relaxed),
            unstable: self.unstable.load(Ordering::Relaxed),
            persisted: self.persisted.load(Ordering::Relaxed),
            pruned: self.pruned.load(Ordering::Relaxed),
            persist_failures: self.persist_failures.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_recorded_events() {
        let metrics = CacheMetrics::new();
        metrics.record_hit();
        metrics.record_hit();
        metrics.record_miss();
        metrics.record_store_error();
        metrics.record_persisted();

        let stats = metrics.snapshot();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.store_errors, 1);
        assert_eq!(stats.persisted, 1);
        assert_eq!(stats.lookups(), 4);
        assert!((stats.hit_rate() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_stats_have_zero_hit_rate() {
        assert_eq!(CacheStats::default().hit_rate(), 0.0);
    }
}
