//! Store Statistics Module
//!
//! Counts lookups, writes and absorbed backend failures.

use serde::Serialize;

// == Cache Stats ==
/// Counters kept by a `Store` across its lifetime.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Lookups that returned a value
    pub hits: u64,
    /// Lookups that returned nothing (including disabled mode)
    pub misses: u64,
    /// Successful writes
    pub writes: u64,
    /// Backend failures converted to a neutral result
    pub errors: u64,
}

impl CacheStats {
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Returns hits / (hits + misses), or 0.0 if no lookups have been made.
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

    pub fn record_error(&mut self) {
        self.errors += 1;
    }
}
