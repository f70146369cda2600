//! Serializable reports produced by the cache layer
//!
//! Shapes handed to request boundaries for health endpoints, stats
//! endpoints and error bodies.

use serde::Serialize;

use crate::store::CacheStats;

/// Outcome of a store health check.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    /// "healthy" when the backend answers writes and reads, else "degraded"
    pub status: String,
    /// A backend connection is attached
    pub cache_enabled: bool,
    /// A check value round-tripped through the backend
    pub cache_working: bool,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthReport {
    pub fn new(cache_enabled: bool, cache_working: bool) -> Self {
        let status = if cache_enabled && cache_working {
            "healthy"
        } else {
            "degraded"
        };
        Self {
            status: status.to_string(),
            cache_enabled,
            cache_working,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

/// Snapshot of store counters with the derived hit rate.
#[derive(Debug, Clone, Serialize)]
pub struct StatsReport {
    pub hits: u64,
    pub misses: u64,
    pub writes: u64,
    pub errors: u64,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
}

impl From<CacheStats> for StatsReport {
    fn from(stats: CacheStats) -> Self {
        Self {
            hit_rate: stats.hit_rate(),
            hits: stats.hits,
            misses: stats.misses,
            writes: stats.writes,
            errors: stats.errors,
        }
    }
}

/// Error response body for denials
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
