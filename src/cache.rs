// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Bounded in-process cache with per-entry expiry.
//!
//! Backs both the session store and the trip index. Entries are evicted when
//! their TTL elapses (lazily on read, or eagerly by the sweeper) and, once the
//! capacity is reached, in least-recently-used order.

use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use lru::LruCache;

struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Expiring key→value cache safe to share between request tasks.
///
/// The lock is only held for the duration of a single map operation and is
/// never held across an `.await`.
pub struct ExpiringCache<V> {
    entries: Mutex<LruCache<String, CacheEntry<V>>>,
    default_ttl: Duration,
}

impl<V: Clone> ExpiringCache<V> {
    /// Create a cache holding at most `capacity` entries.
    pub fn new(capacity: usize, default_ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN),
            )),
            default_ttl,
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Insert or replace `key` using the default TTL. Last write wins.
    pub fn insert(&self, key: impl Into<String>, value: V) {
        self.insert_with_ttl(key, value, self.default_ttl);
    }

    pub fn insert_with_ttl(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let entry = CacheEntry {
            value,
            expires_at: Instant::now() + ttl,
        };
        self.lock().put(key.into(), entry);
    }

    /// Return a live value, dropping it first if it has expired.
    pub fn get(&self, key: &str) -> Option<V> {
        let mut entries = self.lock();
        let now = Instant::now();
        let expired = match entries.get(key) {
            Some(entry) if !entry.is_expired(now) => return Some(entry.value.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.pop(key);
        }
        None
    }

    /// Time left before `key` expires, if it is live.
    pub fn remaining_ttl(&self, key: &str) -> Option<Duration> {
        let entries = self.lock();
        let now = Instant::now();
        entries
            .peek(key)
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| entry.expires_at.saturating_duration_since(now))
    }

    pub fn remove(&self, key: &str) -> Option<V> {
        self.lock().pop(key).map(|entry| entry.value)
    }

    /// Number of stored entries, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<V> ExpiringCache<V> {
    fn lock(&self) -> MutexGuard<'_, LruCache<String, CacheEntry<V>>> {
        // Entries are plain values; a panic mid-operation cannot leave one half-written.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Maintenance operations the sweeper runs over every cache it owns.
pub trait Purge: Send + Sync {
    /// Drop every expired entry, returning how many were removed.
    fn purge_expired(&self) -> usize;

    /// Drop everything.
    fn flush(&self);
}

impl<V: Send> Purge for ExpiringCache<V> {
    fn purge_expired(&self) -> usize {
        let mut entries = self.lock();
        let now = Instant::now();
        let expired: Vec<String> = entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            entries.pop(key);
        }
        expired.len()
    }

    fn flush(&self) {
        self.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_get() {
        let cache = ExpiringCache::new(10, Duration::from_secs(300));
        assert!(cache.get("session-1").is_none());

        cache.insert("session-1", "token-a".to_string());
        assert_eq!(cache.get("session-1").as_deref(), Some("token-a"));
    }

    #[test]
    fn last_write_wins() {
        let cache = ExpiringCache::new(10, Duration::from_secs(300));
        cache.insert("trip-1", 7_u64);
        cache.insert("trip-1", 9_u64);
        assert_eq!(cache.get("trip-1"), Some(9));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn ttl_expiry() {
        let cache = ExpiringCache::new(10, Duration::from_millis(1));
        cache.insert("session-1", "token-a".to_string());

        std::thread::sleep(Duration::from_millis(5));

        assert!(cache.get("session-1").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn per_entry_ttl_overrides_default() {
        let cache = ExpiringCache::new(10, Duration::from_millis(1));
        cache.insert_with_ttl("long", 1_u8, Duration::from_secs(60));
        cache.insert("short", 2_u8);

        std::thread::sleep(Duration::from_millis(5));

        assert_eq!(cache.get("long"), Some(1));
        assert!(cache.get("short").is_none());
    }

    #[test]
    fn remaining_ttl_is_bounded_by_insert_ttl() {
        let cache = ExpiringCache::new(10, Duration::from_secs(7200));
        cache.insert("session-1", ());
        let remaining = cache.remaining_ttl("session-1").unwrap();
        assert!(remaining <= Duration::from_secs(7200));
        assert!(remaining > Duration::from_secs(7190));
        assert!(cache.remaining_ttl("missing").is_none());
    }

    #[test]
    fn remove_returns_value() {
        let cache = ExpiringCache::new(10, Duration::from_secs(300));
        cache.insert("session-1", "token-a".to_string());
        assert_eq!(cache.remove("session-1").as_deref(), Some("token-a"));
        assert!(cache.get("session-1").is_none());
        assert!(cache.remove("session-1").is_none());
    }

    #[test]
    fn capacity_evicts_least_recently_used() {
        let cache = ExpiringCache::new(2, Duration::from_secs(300));
        cache.insert("a", 1);
        cache.insert("b", 2);
        // touch "a" so "b" becomes the eviction candidate
        assert_eq!(cache.get("a"), Some(1));
        cache.insert("c", 3);

        assert_eq!(cache.get("a"), Some(1));
        assert!(cache.get("b").is_none());
        assert_eq!(cache.get("c"), Some(3));
    }

    #[test]
    fn zero_capacity_still_holds_one_entry() {
        let cache = ExpiringCache::new(0, Duration::from_secs(300));
        cache.insert("a", 1);
        assert_eq!(cache.get("a"), Some(1));
    }

    #[test]
    fn purge_expired_only_drops_stale_entries() {
        let cache = ExpiringCache::new(10, Duration::from_millis(1));
        cache.insert("stale-1", 1);
        cache.insert("stale-2", 2);
        cache.insert_with_ttl("fresh", 3, Duration::from_secs(60));

        std::thread::sleep(Duration::from_millis(5));

        assert_eq!(cache.purge_expired(), 2);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("fresh"), Some(3));
    }

    #[test]
    fn flush_clears_everything() {
        let cache = ExpiringCache::new(10, Duration::from_secs(300));
        cache.insert("a", 1);
        cache.insert("b", 2);
        cache.flush();
        assert!(cache.is_empty());
    }
}
