//! Cache Layer - fail-soft caching and rate limiting over a TTL key-value store
//!
//! Sits between request handlers and the database:
//! - `store`: fail-soft handle over Redis (or an in-process backend)
//! - `keys`: deterministic cache keys from call arguments
//! - `memo`: cache-aside wrapping of idempotent async operations
//! - `rate_limit`: fixed-window request counting with an axum guard

pub mod clock;
pub mod config;
pub mod error;
pub mod keys;
pub mod memo;
pub mod models;
pub mod rate_limit;
pub mod store;
pub mod tasks;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use error::{CacheError, RateLimitExceeded};
pub use keys::{derive_key, CallArgs, ContextOnly, KeyArg, KeyArgs, KeyPart};
pub use memo::{memoize, MemoOptions, Memoized};
pub use rate_limit::{guard, RateLimiter};
pub use store::{KvBackend, MemoryBackend, RedisBackend, Store};
pub use tasks::{spawn_cleanup_task, spawn_cleanup_task_from_config};
