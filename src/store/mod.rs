//! Store Module
//!
//! Fail-soft handle over a TTL-capable key-value backend.
//!
//! Every operation converts backend failures into a neutral result
//! (`None`, `false` or `0`) after logging them. A store without an attached
//! backend is in disabled mode: reads miss, writes report `false`, and
//! nothing is raised to the caller.
//!
//! # Example
//! ```ignore
//! let store = Store::new("redis://localhost:6379");
//! store.connect().await;
//! store.set("greeting", &"hello", 60).await;
//! let value = store.get("greeting").await;
//! store.disconnect().await;
//! ```

mod entry;
mod memory;
mod redis_backend;
mod stats;

#[cfg(test)]
mod property_tests;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::Result;
use crate::models::{HealthReport, StatsReport};

pub use entry::MemoryEntry;
pub use memory::{glob_to_regex, MemoryBackend};
pub use redis_backend::RedisBackend;
pub use stats::CacheStats;

/// Key written by `Store::health_check`.
pub const HEALTH_CHECK_KEY: &str = "health_check";

const HEALTH_CHECK_TTL: u64 = 60;

// == Backend Trait ==
/// Raw operations a TTL-capable key-value server must provide.
///
/// Values are opaque strings here; JSON encoding happens in `Store`.
#[async_trait]
pub trait KvBackend: Send + Sync + fmt::Debug {
    async fn ping(&self) -> Result<()>;

    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Stores `value` under `key`, expiring after `ttl` seconds.
    async fn set_ex(&self, key: &str, value: &str, ttl: u64) -> Result<()>;

    /// Removes `keys`, returning how many existed.
    async fn del(&self, keys: &[String]) -> Result<u64>;

    /// Lists keys matching a glob pattern.
    async fn keys(&self, pattern: &str) -> Result<Vec<String>>;
}

// == Store ==
/// Shared, cloneable handle to the cache backend.
///
/// Clones share one connection slot and one set of counters.
#[derive(Clone, Debug)]
pub struct Store {
    inner: Arc<StoreInner>,
}

#[derive(Debug)]
struct StoreInner {
    url: String,
    backend: RwLock<Option<Arc<dyn KvBackend>>>,
    stats: Mutex<CacheStats>,
}

impl Store {
    /// Creates a disabled store that will connect to `url`.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                url: url.into(),
                backend: RwLock::new(None),
                stats: Mutex::new(CacheStats::new()),
            }),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.redis_url.clone())
    }

    pub fn url(&self) -> &str {
        &self.inner.url
    }

    // == Lifecycle ==
    /// Connects to the configured Redis URL.
    ///
    /// On failure the store stays in disabled mode until a later call
    /// succeeds. Returns whether a backend is now attached.
    pub async fn connect(&self) -> bool {
        info!(url = %self.inner.url, "Attempting to connect to cache backend");
        match RedisBackend::connect(&self.inner.url).await {
            Ok(backend) => self.connect_with(Arc::new(backend)).await,
            Err(e) => {
                self.enter_disabled_mode(&e.to_string()).await;
                false
            }
        }
    }

    /// Attaches an already constructed backend once it answers a ping.
    pub async fn connect_with(&self, backend: Arc<dyn KvBackend>) -> bool {
        match backend.ping().await {
            Ok(()) => {
                *self.inner.backend.write().await = Some(backend);
                info!(url = %self.inner.url, "Connected to cache backend");
                true
            }
            Err(e) => {
                self.enter_disabled_mode(&e.to_string()).await;
                false
            }
        }
    }

    async fn enter_disabled_mode(&self, reason: &str) {
        *self.inner.backend.write().await = None;
        error!(url = %self.inner.url, error = %reason, "Failed to connect to cache backend");
        warn!("Cache will be disabled - continuing without backend");
    }

    /// Releases the backend connection. No-op when not connected.
    pub async fn disconnect(&self) {
        if self.inner.backend.write().await.take().is_some() {
            info!(url = %self.inner.url, "Disconnected from cache backend");
        }
    }

    pub async fn is_enabled(&self) -> bool {
        self.inner.backend.read().await.is_some()
    }

    async fn backend(&self) -> Option<Arc<dyn KvBackend>> {
        self.inner.backend.read().await.clone()
    }

    // == Get ==
    /// Reads and decodes the JSON value under `key`.
    ///
    /// Misses, undecodable payloads, a stored `null`, backend errors and
    /// disabled mode all yield `None`.
    pub async fn get(&self, key: &str) -> Option<Value> {
        let Some(backend) = self.backend().await else {
            self.inner.stats.lock().await.record_miss();
            return None;
        };

        let raw = match backend.get(key).await {
            Ok(raw) => raw,
            Err(e) => {
                error!(key, error = %e, "Cache get error");
                self.record_failed_lookup().await;
                return None;
            }
        };

        let value = match raw.as_deref() {
            None | Some("") => None,
            Some(raw) => match serde_json::from_str::<Value>(raw) {
                Ok(Value::Null) => None,
                Ok(value) => Some(value),
                Err(e) => {
                    error!(key, error = %e, "Cache get error: undecodable payload");
                    self.record_failed_lookup().await;
                    return None;
                }
            },
        };

        let mut stats = self.inner.stats.lock().await;
        if value.is_some() {
            stats.record_hit();
        } else {
            stats.record_miss();
        }
        value
    }

    /// Reads `key` and decodes it into `T`; a shape mismatch is a miss.
    pub async fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.get(key).await?;
        match serde_json::from_value(value) {
            Ok(typed) => Some(typed),
            Err(e) => {
                warn!(key, error = %e, "Cached value has unexpected shape");
                None
            }
        }
    }

    async fn record_failed_lookup(&self) {
        let mut stats = self.inner.stats.lock().await;
        stats.record_error();
        stats.record_miss();
    }

    // == Set ==
    /// Stores `value` as JSON under `key` for `ttl` seconds.
    ///
    /// Returns `false` on encoding failure, backend failure or disabled mode.
    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl: u64) -> bool {
        let Some(backend) = self.backend().await else {
            return false;
        };

        let encoded = match serde_json::to_string(value) {
            Ok(encoded) => encoded,
            Err(e) => {
                error!(key, error = %e, "Cache set error: value not serializable");
                self.inner.stats.lock().await.record_error();
                return false;
            }
        };

        match backend.set_ex(key, &encoded, ttl).await {
            Ok(()) => {
                self.inner.stats.lock().await.record_write();
                true
            }
            Err(e) => {
                error!(key, ttl, error = %e, "Cache set error");
                self.inner.stats.lock().await.record_error();
                false
            }
        }
    }

    // == Delete ==
    /// Removes `key`. Returns `true` once the backend accepted the delete,
    /// whether or not the key existed.
    pub async fn delete(&self, key: &str) -> bool {
        let Some(backend) = self.backend().await else {
            return false;
        };

        match backend.del(&[key.to_string()]).await {
            Ok(removed) => {
                debug!(key, removed, "Cache delete");
                true
            }
            Err(e) => {
                error!(key, error = %e, "Cache delete error");
                self.inner.stats.lock().await.record_error();
                false
            }
        }
    }

    // == Clear Pattern ==
    /// Deletes every key matching the glob `pattern` in one batch.
    ///
    /// Returns the number removed; 0 on no match, failure or disabled mode.
    pub async fn clear_pattern(&self, pattern: &str) -> u64 {
        let Some(backend) = self.backend().await else {
            return 0;
        };

        let keys = match backend.keys(pattern).await {
            Ok(keys) => keys,
            Err(e) => {
                error!(pattern, error = %e, "Cache clear pattern error");
                self.inner.stats.lock().await.record_error();
                return 0;
            }
        };
        if keys.is_empty() {
            return 0;
        }

        match backend.del(&keys).await {
            Ok(removed) => {
                info!(pattern, removed, "Cleared cache keys");
                removed
            }
            Err(e) => {
                error!(pattern, error = %e, "Cache clear pattern error");
                self.inner.stats.lock().await.record_error();
                0
            }
        }
    }

    // == Stats ==
    pub async fn stats(&self) -> CacheStats {
        self.inner.stats.lock().await.clone()
    }

    /// Counters plus hit rate, ready to serialize.
    pub async fn stats_report(&self) -> StatsReport {
        StatsReport::from(self.stats().await)
    }

    // == Health ==
    /// Writes a check value and reads it back.
    pub async fn health_check(&self) -> HealthReport {
        let enabled = self.is_enabled().await;
        let working = enabled
            && self.set(HEALTH_CHECK_KEY, "ok", HEALTH_CHECK_TTL).await
            && self.get_as::<String>(HEALTH_CHECK_KEY).await.as_deref() == Some("ok");
        HealthReport::new(enabled, working)
    }
}
