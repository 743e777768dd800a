//! Proxy Statistics Module
//!
//! Tracks how intercepted requests were answered.

use serde::Serialize;

// == Cache Stats ==
/// Tracks proxy cache metrics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    /// Requests answered from the current store
    pub hits: u64,
    /// Requests that had to go to the network
    pub misses: u64,
    /// Network responses written back to the store
    pub fills: u64,
    /// Write-backs that failed and were dropped
    pub fill_failures: u64,
    /// Misses whose network fetch was rejected
    pub network_failures: u64,
    /// Failed navigations answered with the stored root document
    pub offline_fallbacks: u64,
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
    /// Returns hits / (hits + misses), or 0.0 if no requests have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// Increments the hit counter.
    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    /// Increments the miss counter.
    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    /// Increments the fill counter.
    pub fn record_fill(&mut self) {
        self.fills += 1;
    }

    /// Increments the fill failure counter.
    pub fn record_fill_failure(&mut self) {
        self.fill_failures += 1;
    }

    /// Increments the network failure counter.
    pub fn record_network_failure(&mut self) {
        self.network_failures += 1;
    }

    /// Increments the offline fallback counter.
    pub fn record_offline_fallback(&mut self) {
        self.offline_fallbacks += 1;
    }
}
