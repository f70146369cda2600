//! Redis backend over a managed multiplexed connection.
//!
//! `ConnectionManager` re-establishes the connection after it drops, so a
//! restarted server is picked up without reconnecting the store.

use std::fmt;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use tracing::debug;

use crate::error::{CacheError, Result};
use crate::store::KvBackend;

#[derive(Clone)]
pub struct RedisBackend {
    connection: ConnectionManager,
}

impl fmt::Debug for RedisBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisBackend").finish_non_exhaustive()
    }
}

impl RedisBackend {
    /// Opens a client for `url` and establishes the shared connection.
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url).map_err(|e| {
            CacheError::Connection(format!("Failed to create Redis client: {}", e))
        })?;
        let connection = client
            .get_connection_manager()
            .await
            .map_err(|e| CacheError::Connection(format!("Failed to connect to Redis: {}", e)))?;
        Ok(Self { connection })
    }
}

#[async_trait]
impl KvBackend for RedisBackend {
    async fn ping(&self) -> Result<()> {
        let mut conn = self.connection.clone();
        redis::cmd("PING").query_async::<String>(&mut conn).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.connection.clone();
        let value = redis::cmd("GET")
            .arg(key)
            .query_async::<Option<String>>(&mut conn)
            .await?;
        Ok(value)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: u64) -> Result<()> {
        let mut conn = self.connection.clone();
        redis::cmd("SETEX")
            .arg(key)
            .arg(ttl)
            .arg(value)
            .query_async::<()>(&mut conn)
            .await?;
        debug!(key, ttl, "[Redis] SETEX");
        Ok(())
    }

    async fn del(&self, keys: &[String]) -> Result<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut conn = self.connection.clone();
        let mut cmd = redis::cmd("DEL");
        for key in keys {
            cmd.arg(key);
        }
        let removed = cmd.query_async::<u64>(&mut conn).await?;
        debug!(requested = keys.len(), removed, "[Redis] DEL");
        Ok(removed)
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>> {
        let mut conn = self.connection.clone();
        let keys = redis::cmd("KEYS")
            .arg(pattern)
            .query_async::<Vec<String>>(&mut conn)
            .await?;
        Ok(keys)
    }
}
