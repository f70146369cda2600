//! Background Tasks Module
//!
//! # Tasks
//! - Expiry sweep: drops expired in-memory entries at configured intervals

mod cleanup;

pub use cleanup::{spawn_cleanup_task, spawn_cleanup_task_from_config};
