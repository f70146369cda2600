//! Clock Module
//!
//! Wall-clock source shared by the in-memory backend and the rate limiter.

use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};

/// Source of the current time in whole Unix seconds.
pub trait Clock: Send + Sync + fmt::Debug {
    fn now(&self) -> i64;
}

// == System Clock ==
/// Reads the real time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

// == Manual Clock ==
/// Clock that only moves when told to.
///
/// Lets window boundaries and TTL expiry be exercised without sleeping.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    /// Creates a clock frozen at `start` seconds.
    pub fn new(start: i64) -> Self {
        Self {
            now: AtomicI64::new(start),
        }
    }

    /// Moves the clock forward by `secs`.
    pub fn advance(&self, secs: i64) {
        self.now.fetch_add(secs, Ordering::SeqCst);
    }

    /// Jumps the clock to an absolute time.
    pub fn set(&self, secs: i64) {
        self.now.store(secs, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_advance_and_set() {
        let clock = ManualClock::new(1_000);
        assert_eq!(clock.now(), 1_000);

        clock.advance(61);
        assert_eq!(clock.now(), 1_061);

        clock.set(42);
        assert_eq!(clock.now(), 42);
    }

    #[test]
    fn test_system_clock_is_recent() {
        // 2020-01-01T00:00:00Z
        assert!(SystemClock.now() > 1_577_836_800);
    }
}
