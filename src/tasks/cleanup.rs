//! Expiry Sweep Task
//!
//! Background task that periodically drops expired entries from a
//! `MemoryBackend`. Reads already ignore expired entries; the sweep only
//! reclaims their memory.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::config::Config;
use crate::store::MemoryBackend;

/// Spawns a background task that periodically purges expired entries.
///
/// # Arguments
/// * `backend` - Shared in-memory backend to sweep
/// * `cleanup_interval_secs` - Interval in seconds between sweeps
///
/// # Returns
/// A JoinHandle for the spawned task, which can be aborted on shutdown.
pub fn spawn_cleanup_task(backend: Arc<MemoryBackend>, cleanup_interval_secs: u64) -> JoinHandle<()> {
    let interval = Duration::from_secs(cleanup_interval_secs.max(1));

    tokio::spawn(async move {
        info!(
            "Starting expiry sweep task with interval of {} seconds",
            interval.as_secs()
        );

        loop {
            tokio::time::sleep(interval).await;

            let removed = backend.purge_expired().await;
            if removed > 0 {
                info!("Expiry sweep: removed {} expired entries", removed);
            } else {
                debug!("Expiry sweep: no expired entries found");
            }
        }
    })
}

/// Spawns the expiry sweep at the configured `cleanup_interval`.
pub fn spawn_cleanup_task_from_config(backend: Arc<MemoryBackend>, config: &Config) -> JoinHandle<()> {
    spawn_cleanup_task(backend, config.cleanup_interval)
}
