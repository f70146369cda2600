//! Rate Limiter Module
//!
//! Fixed-window request counting on top of the shared `Store`.
//!
//! Each identifier gets one counter per window, stored under
//! `rate_limit:{identifier}:{window_start}` with the window length as TTL,
//! so counters vanish on their own once the window is over. The read and
//! the increment are separate store calls: concurrent checks can observe
//! the same count, and a burst straddling a boundary can be admitted up to
//! twice the budget. When the store is disabled every request is allowed.
//!
//! # Example
//! ```ignore
//! let strict = RateLimiter::strict(&store);
//! let app = Router::new()
//!     .route("/login", post(login))
//!     .layer(axum::middleware::from_fn_with_state(strict, guard));
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::error::RateLimitExceeded;
use crate::store::Store;

/// Requests per window for the strict profile.
pub const STRICT_MAX_REQUESTS: u64 = 10;

/// Requests per window for the moderate profile.
pub const MODERATE_MAX_REQUESTS: u64 = 60;

/// Window length shared by both profiles.
pub const DEFAULT_WINDOW_SECONDS: u64 = 60;

/// Identifier used when the client address is unknown.
pub const UNKNOWN_CLIENT: &str = "unknown";

// == Rate Limiter ==
#[derive(Clone, Debug)]
pub struct RateLimiter {
    store: Store,
    max_requests: u64,
    window_seconds: u64,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    /// Creates a limiter admitting `max_requests` per `window_seconds`.
    ///
    /// A zero-length window is treated as one second.
    pub fn new(store: &Store, max_requests: u64, window_seconds: u64) -> Self {
        info!(max_requests, window_seconds, "Initializing rate limiter");
        Self {
            store: store.clone(),
            max_requests,
            window_seconds: window_seconds.max(1),
            clock: Arc::new(SystemClock),
        }
    }

    /// Replaces the time source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn strict(store: &Store) -> Self {
        Self::new(store, STRICT_MAX_REQUESTS, DEFAULT_WINDOW_SECONDS)
    }

    pub fn moderate(store: &Store) -> Self {
        Self::new(store, MODERATE_MAX_REQUESTS, DEFAULT_WINDOW_SECONDS)
    }

    pub fn strict_from_config(store: &Store, config: &Config) -> Self {
        Self::new(store, config.rate_limit_strict, config.rate_limit_window)
    }

    pub fn moderate_from_config(store: &Store, config: &Config) -> Self {
        Self::new(store, config.rate_limit_moderate, config.rate_limit_window)
    }

    pub fn max_requests(&self) -> u64 {
        self.max_requests
    }

    pub fn window_seconds(&self) -> u64 {
        self.window_seconds
    }

    // == Window ==
    /// Start of the window containing the current time.
    pub fn window_start(&self) -> i64 {
        let window = i64::try_from(self.window_seconds).unwrap_or(i64::MAX);
        self.clock.now().div_euclid(window) * window
    }

    /// Counter key for `identifier` in the current window.
    pub fn window_key(&self, identifier: &str) -> String {
        format!("rate_limit:{}:{}", identifier, self.window_start())
    }

    // == Is Allowed ==
    /// Counts one request for `identifier` and reports whether it fits the
    /// budget. Denied requests are not counted.
    pub async fn is_allowed(&self, identifier: &str) -> bool {
        let key = self.window_key(identifier);
        debug!(key = %key, "Rate limit key");

        let current = self
            .store
            .get(&key)
            .await
            .and_then(|count| count.as_u64())
            .unwrap_or(0);
        debug!(identifier, current, max = self.max_requests, "Current count");

        if current >= self.max_requests {
            warn!(identifier, "Rate limit exceeded");
            return false;
        }

        let next = current + 1;
        self.store.set(&key, &next, self.window_seconds).await;
        debug!(identifier, count = next, max = self.max_requests, "Request allowed");
        true
    }

    /// Like `is_allowed`, but reports denial as an error for `?` at the
    /// request boundary.
    pub async fn check(&self, identifier: &str) -> Result<(), RateLimitExceeded> {
        if self.is_allowed(identifier).await {
            Ok(())
        } else {
            Err(RateLimitExceeded {
                identifier: identifier.to_string(),
            })
        }
    }
}

// == Guard Middleware ==
/// Identifies the caller by the connecting IP address.
pub fn client_identifier(request: &Request) -> String {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

/// Axum middleware rejecting over-budget callers with 429.
///
/// Mount with `axum::middleware::from_fn_with_state(limiter, guard)`.
pub async fn guard(State(limiter): State<RateLimiter>, request: Request, next: Next) -> Response {
    let identifier = client_identifier(&request);
    match limiter.check(&identifier).await {
        Ok(()) => next.run(request).await,
        Err(denied) => denied.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::store::MemoryBackend;
    use axum::body::Body;

    // 120 is a window boundary for 60 second windows
    const START: i64 = 120;

    async fn limiter(max_requests: u64, window: u64) -> (RateLimiter, Store, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(START));
        let store = Store::new("memory://");
        store
            .connect_with(Arc::new(MemoryBackend::with_clock(clock.clone())))
            .await;
        let limiter = RateLimiter::new(&store, max_requests, window).with_clock(clock.clone());
        (limiter, store, clock)
    }

    #[test]
    fn test_presets() {
        let store = Store::new("memory://");
        let strict = RateLimiter::strict(&store);
        let moderate = RateLimiter::moderate(&store);
        assert_eq!((strict.max_requests(), strict.window_seconds()), (10, 60));
        assert_eq!((moderate.max_requests(), moderate.window_seconds()), (60, 60));
    }

    #[test]
    fn test_presets_from_config() {
        let store = Store::new("memory://");
        let config = Config {
            rate_limit_strict: 3,
            rate_limit_moderate: 30,
            rate_limit_window: 10,
            ..Config::default()
        };
        let strict = RateLimiter::strict_from_config(&store, &config);
        let moderate = RateLimiter::moderate_from_config(&store, &config);
        assert_eq!((strict.max_requests(), strict.window_seconds()), (3, 10));
        assert_eq!(moderate.max_requests(), 30);
    }

    #[tokio::test]
    async fn test_window_key_floors_time() {
        let (limiter, _, clock) = limiter(3, 60).await;
        assert_eq!(limiter.window_key("1.2.3.4"), "rate_limit:1.2.3.4:120");

        clock.advance(59);
        assert_eq!(limiter.window_start(), 120);
        clock.advance(1);
        assert_eq!(limiter.window_start(), 180);
    }

    #[tokio::test]
    async fn test_zero_window_treated_as_one_second() {
        let (limiter, _, _) = limiter(1, 0).await;
        assert_eq!(limiter.window_seconds(), 1);
        assert_eq!(limiter.window_start(), START);
    }

    #[tokio::test]
    async fn test_budget_then_deny() {
        let (limiter, _, _) = limiter(3, 60).await;
        let results = [
            limiter.is_allowed("client").await,
            limiter.is_allowed("client").await,
            limiter.is_allowed("client").await,
            limiter.is_allowed("client").await,
        ];
        assert_eq!(results, [true, true, true, false]);
    }

    #[tokio::test]
    async fn test_denial_does_not_increment() {
        let (limiter, store, _) = limiter(2, 60).await;
        let key = limiter.window_key("client");
        for _ in 0..5 {
            limiter.is_allowed("client").await;
        }
        assert_eq!(store.get_as::<u64>(&key).await, Some(2));
    }

    #[tokio::test]
    async fn test_non_integer_counter_treated_as_zero() {
        let (limiter, store, _) = limiter(1, 60).await;
        let key = limiter.window_key("client");
        store.set(&key, &"garbage", 60).await;

        assert!(limiter.is_allowed("client").await);
        assert!(!limiter.is_allowed("client").await);
    }

    #[tokio::test]
    async fn test_new_window_resets_budget() {
        let (limiter, _, clock) = limiter(1, 60).await;
        assert!(limiter.is_allowed("client").await);
        assert!(!limiter.is_allowed("client").await);

        clock.advance(60);
        assert!(limiter.is_allowed("client").await);
    }

    #[tokio::test]
    async fn test_check_reports_identifier() {
        let (limiter, _, _) = limiter(0, 60).await;
        let denied = limiter.check("10.0.0.9").await.unwrap_err();
        assert_eq!(denied.identifier, "10.0.0.9");
    }

    #[tokio::test]
    async fn test_disabled_store_always_allows() {
        let store = Store::new("memory://");
        let limiter = RateLimiter::new(&store, 1, 60);
        for _ in 0..10 {
            assert!(limiter.is_allowed("client").await);
        }
    }

    #[test]
    fn test_client_identifier() {
        let mut request = Request::new(Body::empty());
        assert_eq!(client_identifier(&request), UNKNOWN_CLIENT);

        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([192, 168, 1, 20], 4242))));
        assert_eq!(client_identifier(&request), "192.168.1.20");
    }
}
