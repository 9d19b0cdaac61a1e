//! Bounded-TTL answer cache keyed by the normalized query.
//!
//! A pure optimization: disabling it changes latency and cost, never the
//! observable answers. Entries expire lazily at read time.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::core::config::CacheSettings;

struct CacheEntry {
    answer: String,
    inserted_at: Instant,
}

pub struct AnswerCache {
    enabled: bool,
    ttl: Duration,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl AnswerCache {
    pub fn new(settings: &CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            ttl: Duration::from_secs(settings.expiry_seconds),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the cached answer for a normalized query, treating expired
    /// entries as misses. Expired entries are dropped on read, never swept.
    pub fn get(&self, normalized_query: &str) -> Option<String> {
        if !self.enabled {
            return None;
        }
        let mut entries = self.entries.lock().expect("cache mutex poisoned");
        match entries.get(normalized_query) {
            Some(entry) if entry.inserted_at.elapsed() < self.ttl => Some(entry.answer.clone()),
            Some(_) => {
                entries.remove(normalized_query);
                None
            }
            None => None,
        }
    }

    pub fn put(&self, normalized_query: &str, answer: &str) {
        if !self.enabled {
            return;
        }
        let mut entries = self.entries.lock().expect("cache mutex poisoned");
        entries.insert(
            normalized_query.to_string(),
            CacheEntry {
                answer: answer.to_string(),
                inserted_at: Instant::now(),
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache_with(enabled: bool, expiry_seconds: u64) -> AnswerCache {
        AnswerCache::new(&CacheSettings {
            enabled,
            expiry_seconds,
        })
    }

    #[test]
    fn fresh_entries_are_returned() {
        let cache = cache_with(true, 3600);
        cache.put("what is the fee", "The fee is X.");
        assert_eq!(
            cache.get("what is the fee"),
            Some("The fee is X.".to_string())
        );
    }

    #[test]
    fn expired_entries_are_misses() {
        let cache = cache_with(true, 0);
        cache.put("what is the fee", "The fee is X.");
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(cache.get("what is the fee"), None);
    }

    #[test]
    fn disabled_cache_is_a_no_op() {
        let cache = cache_with(false, 3600);
        cache.put("q", "a");
        assert_eq!(cache.get("q"), None);
    }

    #[test]
    fn unknown_keys_miss() {
        let cache = cache_with(true, 3600);
        assert_eq!(cache.get("never cached"), None);
    }
}
