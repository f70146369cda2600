//! Memoizer Module
//!
//! Cache-aside wrapping of idempotent async operations.
//!
//! `memoize` takes an operation together with a static TTL and key prefix
//! and returns a `Memoized` handle. Each call derives a key from the
//! key-relevant arguments, returns the stored value on a hit, and on a
//! miss runs the operation and writes its result back. A failed write is
//! only logged; the fresh result is returned either way.
//!
//! Operations receive two inputs: a context value (database session,
//! connection, request handle) that is passed through untouched and never
//! influences the key, and the key-relevant arguments.
//!
//! Concurrent misses on the same key are not coalesced: each runs the
//! operation and writes the cache.
//!
//! # Example
//! ```ignore
//! let tasks_by_owner = memoize(
//!     &store,
//!     "get_tasks_by_owner",
//!     MemoOptions::new().ttl(300).key_prefix("tasks_by_owner"),
//!     |db: Arc<Db>, (owner_id, skip, limit): (u64, u64, u64)| async move {
//!         db.tasks_by_owner(owner_id, skip, limit).await
//!     },
//! );
//! let tasks = tasks_by_owner.call(db.clone(), (owner_id, 0, 100)).await;
//! ```

use std::fmt;
use std::future::Future;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::Config;
use crate::keys::{derive_key, KeyArgs};
use crate::store::Store;

/// TTL applied when none is configured.
pub const DEFAULT_TTL: u64 = 3600;

// == Memo Options ==
/// Static configuration fixed at composition time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoOptions {
    /// Seconds a memoized result stays in the store
    pub ttl: u64,
    /// Namespace for derived keys
    pub key_prefix: String,
}

impl MemoOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Options with the configured default TTL and no prefix.
    pub fn from_config(config: &Config) -> Self {
        Self::new().ttl(config.default_ttl)
    }

    pub fn ttl(mut self, ttl: u64) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn key_prefix(mut self, key_prefix: impl Into<String>) -> Self {
        self.key_prefix = key_prefix.into();
        self
    }
}

impl Default for MemoOptions {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            key_prefix: String::new(),
        }
    }
}

// == Memoized ==
/// An operation wrapped with cache-aside behaviour.
#[derive(Clone)]
pub struct Memoized<F> {
    store: Store,
    operation: String,
    options: MemoOptions,
    func: F,
}

/// Wraps `func` so its results are cached in `store`.
///
/// `operation` identifies the wrapped function in derived keys; two
/// memoized operations must not share a name unless they are
/// interchangeable.
pub fn memoize<F>(
    store: &Store,
    operation: impl Into<String>,
    options: MemoOptions,
    func: F,
) -> Memoized<F> {
    Memoized {
        store: store.clone(),
        operation: operation.into(),
        options,
        func,
    }
}

impl<F> fmt::Debug for Memoized<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Memoized")
            .field("operation", &self.operation)
            .field("options", &self.options)
            .finish()
    }
}

impl<F> Memoized<F> {
    pub fn operation(&self) -> &str {
        &self.operation
    }

    pub fn options(&self) -> &MemoOptions {
        &self.options
    }

    /// Store key used for `args`.
    ///
    /// With a non-empty prefix the digest is stored as `{prefix}:{digest}`,
    /// so `Store::clear_pattern("{prefix}:*")` drops every memoized result.
    pub fn key_for<A: KeyArgs + ?Sized>(&self, args: &A) -> String {
        let prefix = &self.options.key_prefix;
        let digest = derive_key(prefix, &self.operation, &args.call_args());
        if prefix.is_empty() {
            digest
        } else {
            format!("{}:{}", prefix, digest)
        }
    }

    /// Removes the memoized result for `args`.
    pub async fn invalidate<A: KeyArgs + ?Sized>(&self, args: &A) -> bool {
        self.store.delete(&self.key_for(args)).await
    }

    // == Call ==
    /// Runs the operation through the cache.
    pub async fn call<C, A, Fut, R>(&self, ctx: C, args: A) -> R
    where
        F: Fn(C, A) -> Fut,
        Fut: Future<Output = R>,
        A: KeyArgs,
        R: Serialize + DeserializeOwned,
    {
        let key = self.key_for(&args);
        if let Some(cached) = self.lookup::<R>(&key).await {
            return cached;
        }

        let result = (self.func)(ctx, args).await;
        self.write_back(&key, &result).await;
        result
    }

    /// Runs a fallible operation through the cache. Only `Ok` values are
    /// stored; errors pass straight through.
    pub async fn try_call<C, A, Fut, R, E>(&self, ctx: C, args: A) -> Result<R, E>
    where
        F: Fn(C, A) -> Fut,
        Fut: Future<Output = Result<R, E>>,
        A: KeyArgs,
        R: Serialize + DeserializeOwned,
    {
        let key = self.key_for(&args);
        if let Some(cached) = self.lookup::<R>(&key).await {
            return Ok(cached);
        }

        let result = (self.func)(ctx, args).await?;
        self.write_back(&key, &result).await;
        Ok(result)
    }

    async fn lookup<R: DeserializeOwned>(&self, key: &str) -> Option<R> {
        debug!(operation = %self.operation, key, "Cache key");
        let cached = self.store.get_as::<R>(key).await;
        if cached.is_some() {
            debug!(operation = %self.operation, "Cache HIT");
        } else {
            debug!(operation = %self.operation, "Cache MISS");
        }
        cached
    }

    async fn write_back<R: Serialize>(&self, key: &str, result: &R) {
        let stored = self.store.set(key, result, self.options.ttl).await;
        if !stored {
            info!(operation = %self.operation, key, "Memoized result not cached");
        }
    }
}
