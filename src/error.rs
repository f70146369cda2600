//! Error types for the cache layer
//!
//! `CacheError` travels between the `Store` and its backends and never
//! reaches callers of the store. `RateLimitExceeded` is the one condition
//! surfaced to request boundaries, where it renders as HTTP 429.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Cache Error Enum ==
/// Failures raised by key-value backends.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Backend could not be reached or the handshake failed
    #[error("Connection error: {0}")]
    Connection(String),

    /// A command was rejected or returned an unexpected reply
    #[error("Operation error: {0}")]
    Operation(String),

    /// Value could not be encoded or decoded as JSON
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Redis transport or protocol failure
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Glob pattern could not be compiled
    #[error("Invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

// == Result Type Alias ==
/// Convenience Result type for backend operations.
pub type Result<T> = std::result::Result<T, CacheError>;

// == Rate Limit Exceeded ==
/// Returned by the rate limiter when an identifier has used up its window.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Rate limit exceeded for {identifier}")]
pub struct RateLimitExceeded {
    /// Caller identifier that was denied
    pub identifier: String,
}

/// Message sent to clients on denial.
pub const RATE_LIMIT_MESSAGE: &str = "Rate limit exceeded. Please try again later.";

impl IntoResponse for RateLimitExceeded {
    fn into_response(self) -> Response {
        (
            StatusCode::TOO_MANY_REQUESTS,
            Json(ErrorResponse::new(RATE_LIMIT_MESSAGE)),
        )
            .into_response()
    }
}
