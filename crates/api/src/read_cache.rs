//! Short-lived in-process cache in front of leaderboard queries.
//!
//! Entries are shared as `Arc<V>`, so every hit within the TTL returns the
//! very same value (same rows, same `updatedAt`). The lock is only held for
//! map operations, never across a store round-trip; concurrent misses on
//! one key each query the store and the last insert wins.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

struct Entry<V> {
    value: Arc<V>,
    expires_at: Instant,
}

impl<V> Entry<V> {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// TTL map keyed by normalised query.
pub struct ReadCache<K, V> {
    ttl: Duration,
    entries: RwLock<HashMap<K, Entry<V>>>,
}

impl<K, V> ReadCache<K, V>
where
    K: Eq + Hash,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The cached value for `key`, if present and not yet expired.
    pub fn get(&self, key: &K) -> Option<Arc<V>> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries
            .get(key)
            .filter(|entry| entry.is_live(Instant::now()))
            .map(|entry| Arc::clone(&entry.value))
    }

    /// Store `value` under `key` for one TTL and return the shared handle.
    ///
    /// Expired entries are dropped on the way, which keeps the map bounded
    /// by the number of distinct keys seen within one TTL.
    pub fn insert(&self, key: K, value: V) -> Arc<V> {
        let value = Arc::new(value);
        let now = Instant::now();
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.retain(|_, entry| entry.is_live(now));
        entries.insert(
            key,
            Entry {
                value: Arc::clone(&value),
                expires_at: now + self.ttl,
            },
        );
        value
    }

    /// Drop all expired entries, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let before = entries.len();
        entries.retain(|_, entry| entry.is_live(now));
        before - entries.len()
    }

    /// Number of entries, live or not yet purged.
    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_returns_the_same_instance() {
        let cache: ReadCache<&str, String> = ReadCache::new(Duration::from_secs(60));
        let stored = cache.insert("level", "page".to_string());

        let hit = cache.get(&"level").unwrap();
        assert!(Arc::ptr_eq(&stored, &hit));
        assert!(cache.get(&"fame").is_none());
    }

    #[test]
    fn zero_ttl_never_hits() {
        let cache: ReadCache<u8, u8> = ReadCache::new(Duration::ZERO);
        cache.insert(1, 1);
        assert!(cache.get(&1).is_none());
    }

    #[test]
    fn expired_entries_are_purged() {
        let cache: ReadCache<u8, u8> = ReadCache::new(Duration::from_millis(20));
        cache.insert(1, 1);
        cache.insert(2, 2);
        assert_eq!(cache.len(), 2);

        std::thread::sleep(Duration::from_millis(40));

        assert!(cache.get(&1).is_none());
        assert_eq!(cache.purge_expired(), 2);
        assert!(cache.is_empty());
    }

    #[test]
    fn insert_drops_expired_neighbours() {
        let cache: ReadCache<u8, u8> = ReadCache::new(Duration::from_millis(200));
        cache.insert(1, 1);
        std::thread::sleep(Duration::from_millis(250));

        cache.insert(2, 2);
        assert_eq!(cache.len(), 1);
        assert!(cache.get(&2).is_some());
    }

    #[test]
    fn reinsert_replaces_value() {
        let cache: ReadCache<u8, &str> = ReadCache::new(Duration::from_secs(60));
        cache.insert(1, "old");
        cache.insert(1, "new");
        assert_eq!(*cache.get(&1).unwrap(), "new");
    }
}
