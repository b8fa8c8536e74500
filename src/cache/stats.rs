//! Cache Statistics Module
//!
//! Tracks cache effectiveness: hits, misses, writes and removals.

use serde::Serialize;

// == Cache Stats ==
/// Counters accumulated by a cache manager over its lifetime.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    /// Number of reads served from the store
    pub hits: u64,
    /// Number of reads that found nothing usable
    pub misses: u64,
    /// Number of entries written
    pub writes: u64,
    /// Number of writes abandoned after the retry
    pub write_failures: u64,
    /// Entries removed lazily on read (expired, corrupt or stale version)
    pub purged: u64,
    /// Entries removed by sweeps
    pub swept: u64,
    /// Current number of entries under the namespace
    pub total_entries: usize,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no reads have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_write(&mut self) {
        self.writes += 1;
    }

    pub fn record_write_failure(&mut self) {
        self.write_failures += 1;
    }

    pub fn record_purge(&mut self) {
        self.purged += 1;
    }

    pub fn record_sweep(&mut self, removed: usize) {
        self.swept += removed as u64;
    }

    // == Update Entry Count ==
    /// Updates the total entries count.
    pub fn set_total_entries(&mut self, count: usize) {
        self.total_entries = count;
    }
}
