//! Report and error body models
//!
//! Serializable shapes the cache layer hands to request boundaries.

pub mod responses;

pub use responses::{ErrorResponse, HealthReport, StatsReport};
