//! In-Memory Backend Module
//!
//! Process-local TTL map implementing `KvBackend`. Expiry is evaluated
//! against an injectable clock, so tests can move time instead of sleeping.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;
use tokio::sync::RwLock;
use tracing::debug;

use crate::clock::{Clock, SystemClock};
use crate::error::{CacheError, Result};
use crate::store::entry::MemoryEntry;
use crate::store::KvBackend;

// == Memory Backend ==
/// Key-value map with per-entry expiry.
#[derive(Debug)]
pub struct MemoryBackend {
    entries: RwLock<HashMap<String, MemoryEntry>>,
    clock: Arc<dyn Clock>,
}

impl MemoryBackend {
    /// Creates an empty backend on the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Creates an empty backend that reads time from `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            clock,
        }
    }

    // == Purge Expired ==
    /// Removes all expired entries, returning how many were dropped.
    pub async fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before - entries.len()
    }

    /// Number of live (unexpired) entries.
    pub async fn len(&self) -> usize {
        let now = self.clock.now();
        self.entries
            .read()
            .await
            .values()
            .filter(|entry| !entry.is_expired(now))
            .count()
    }

    /// Number of stored entries, including expired ones not yet purged.
    pub async fn stored_len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Remaining lifetime of `key` in seconds, if it is live.
    pub async fn ttl(&self, key: &str) -> Option<u64> {
        let now = self.clock.now();
        self.entries
            .read()
            .await
            .get(key)
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| entry.ttl_remaining(now))
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KvBackend for MemoryBackend {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let now = self.clock.now();
        let entries = self.entries.read().await;
        Ok(entries
            .get(key)
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| entry.value.clone()))
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: u64) -> Result<()> {
        if ttl == 0 {
            return Err(CacheError::Operation(format!(
                "invalid expire time for key {}",
                key
            )));
        }
        let entry = MemoryEntry::new(value.to_string(), self.clock.now(), ttl);
        self.entries.write().await.insert(key.to_string(), entry);
        Ok(())
    }

    async fn del(&self, keys: &[String]) -> Result<u64> {
        let now = self.clock.now();
        let mut entries = self.entries.write().await;
        let mut removed = 0;
        for key in keys {
            if let Some(entry) = entries.remove(key) {
                if !entry.is_expired(now) {
                    removed += 1;
                }
            }
        }
        Ok(removed)
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>> {
        let matcher = glob_to_regex(pattern)?;
        let now = self.clock.now();
        let entries = self.entries.read().await;
        let matched: Vec<String> = entries
            .iter()
            .filter(|(key, entry)| !entry.is_expired(now) && matcher.is_match(key))
            .map(|(key, _)| key.clone())
            .collect();
        debug!(pattern, matched = matched.len(), "Memory backend key scan");
        Ok(matched)
    }
}

// == Glob Matching ==
/// Compiles a Redis-style glob into an anchored regex.
///
/// Supports `*`, `?`, `[...]` classes (with `^` negation and ranges) and
/// backslash escapes. An unterminated `[` matches literally.
pub fn glob_to_regex(pattern: &str) -> Result<Regex> {
    let mut re = String::with_capacity(pattern.len() * 2 + 6);
    re.push_str("(?s)^");
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' => re.push_str(".*"),
            '?' => re.push('.'),
            '\\' => match chars.next() {
                Some(escaped) => re.push_str(&regex::escape(&escaped.to_string())),
                None => re.push_str(r"\\"),
            },
            '[' => {
                let mut class = String::new();
                let mut closed = false;
                if chars.peek() == Some(&'^') {
                    chars.next();
                    class.push('^');
                }
                while let Some(inner) = chars.next() {
                    match inner {
                        ']' => {
                            closed = true;
                            break;
                        }
                        '\\' => {
                            if let Some(escaped) = chars.next() {
                                if !escaped.is_alphanumeric() {
                                    class.push('\\');
                                }
                                class.push(escaped);
                            }
                        }
                        '[' | '&' | '~' => {
                            class.push('\\');
                            class.push(inner);
                        }
                        other => class.push(other),
                    }
                }
                if closed {
                    re.push('[');
                    re.push_str(&class);
                    re.push(']');
                } else {
                    re.push_str(r"\[");
                    re.push_str(&regex::escape(&class));
                }
            }
            other => re.push_str(&regex::escape(&other.to_string())),
        }
    }
    re.push('$');
    Ok(Regex::new(&re)?)
}
