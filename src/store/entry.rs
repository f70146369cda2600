//! Memory Entry Module
//!
//! A single value held by the in-memory backend, with its expiry instant.

// == Memory Entry ==
/// Stored value plus the second at which it stops being visible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryEntry {
    /// Serialized payload
    pub value: String,
    /// Expiration timestamp (Unix seconds)
    pub expires_at: i64,
}

impl MemoryEntry {
    /// Creates an entry that lives `ttl_secs` seconds from `now`.
    pub fn new(value: String, now: i64, ttl_secs: u64) -> Self {
        let ttl = i64::try_from(ttl_secs).unwrap_or(i64::MAX);
        Self {
            value,
            expires_at: now.saturating_add(ttl),
        }
    }

    // == Is Expired ==
    /// An entry is expired once `now` reaches its expiration second.
    pub fn is_expired(&self, now: i64) -> bool {
        now >= self.expires_at
    }

    /// Seconds left before expiry, 0 once expired.
    pub fn ttl_remaining(&self, now: i64) -> u64 {
        u64::try_from(self.expires_at - now).unwrap_or(0)
    }
}
