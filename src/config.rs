//! Configuration Module
//!
//! Loads cache and rate limit settings from environment variables.

use std::env;

/// Cache layer configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// URL of the backing key-value server
    pub redis_url: String,
    /// Default TTL in seconds for memoized results
    pub default_ttl: u64,
    /// Length of a rate limit window in seconds
    pub rate_limit_window: u64,
    /// Requests per window for the strict profile
    pub rate_limit_strict: u64,
    /// Requests per window for the moderate profile
    pub rate_limit_moderate: u64,
    /// Interval in seconds between in-memory expiry sweeps
    pub cleanup_interval: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `REDIS_URL` - Backend URL (default: redis://localhost:6379)
    /// - `CACHE_DEFAULT_TTL` - Memoizer TTL in seconds (default: 3600)
    /// - `RATE_LIMIT_WINDOW` - Window length in seconds (default: 60)
    /// - `RATE_LIMIT_STRICT` - Strict profile budget (default: 10)
    /// - `RATE_LIMIT_MODERATE` - Moderate profile budget (default: 60)
    /// - `CLEANUP_INTERVAL` - Expiry sweep frequency in seconds (default: 1)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            redis_url: env::var("REDIS_URL").unwrap_or(defaults.redis_url),
            default_ttl: parse_var("CACHE_DEFAULT_TTL").unwrap_or(defaults.default_ttl),
            rate_limit_window: parse_var("RATE_LIMIT_WINDOW")
                .unwrap_or(defaults.rate_limit_window),
            rate_limit_strict: parse_var("RATE_LIMIT_STRICT")
                .unwrap_or(defaults.rate_limit_strict),
            rate_limit_moderate: parse_var("RATE_LIMIT_MODERATE")
                .unwrap_or(defaults.rate_limit_moderate),
            cleanup_interval: parse_var("CLEANUP_INTERVAL").unwrap_or(defaults.cleanup_interval),
        }
    }
}

fn parse_var(name: &str) -> Option<u64> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            redis_url: "redis://localhost:6379".to_string(),
            default_ttl: 3600,
            rate_limit_window: 60,
            rate_limit_strict: 10,
            rate_limit_moderate: 60,
            cleanup_interval: 1,
        }
    }
}
