use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::time::{Duration, Instant};

use crate::config::CatalogConfig;

/// Cache entry with timestamp for TTL tracking.
#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    inserted_at: Instant,
}

/// Metadata cache with TTL and size limits, keyed by catalog coordinates.
#[derive(Debug)]
pub struct SchemaCache<K, V> {
    entries: HashMap<K, CacheEntry<V>>,
    ttl: Duration,
    max_size: usize,
}

impl<K, V> Default for SchemaCache<K, V>
where
    K: Eq + Hash + Clone + Debug,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> SchemaCache<K, V>
where
    K: Eq + Hash + Clone + Debug,
{
    pub fn new() -> Self {
        Self::with_config(&CatalogConfig::default())
    }

    /// Create a cache with configuration.
    pub fn with_config(config: &CatalogConfig) -> Self {
        Self {
            entries: HashMap::new(),
            ttl: Duration::from_secs(config.ttl_secs),
            max_size: config.max_size.max(1),
        }
    }

    pub fn insert(&mut self, key: K, value: V) {
        if !self.entries.contains_key(&key) && self.entries.len() >= self.max_size {
            self.evict_oldest();
        }
        self.entries.insert(
            key,
            CacheEntry {
                value,
                inserted_at: Instant::now(),
            },
        );
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.entries.get(key).and_then(|entry| {
            if entry.inserted_at.elapsed() < self.ttl {
                Some(&entry.value)
            } else {
                // Expired - treat as cache miss
                None
            }
        })
    }

    pub fn contains(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    /// Remove expired entries from the cache.
    pub fn evict_expired(&mut self) {
        let ttl = self.ttl;
        self.entries
            .retain(|_, entry| entry.inserted_at.elapsed() < ttl);
    }

    fn evict_oldest(&mut self) {
        if let Some(oldest_key) = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.inserted_at)
            .map(|(k, _)| k.clone())
        {
            tracing::debug!(key = ?oldest_key, "evicting oldest catalog entry");
            self.entries.remove(&oldest_key);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(ttl_secs: u64, max_size: usize) -> CatalogConfig {
        CatalogConfig {
            ttl_secs,
            max_size,
            ..CatalogConfig::default()
        }
    }

    #[test]
    fn hit_within_ttl() {
        let mut cache: SchemaCache<(String, String), Vec<String>> = SchemaCache::new();
        let key = ("DB".to_string(), "PUBLIC".to_string());
        cache.insert(key.clone(), vec!["ORDERS".to_string()]);
        assert_eq!(cache.get(&key).map(Vec::len), Some(1));
        assert!(cache.contains(&key));
    }

    #[test]
    fn zero_ttl_always_misses() {
        let mut cache: SchemaCache<String, u32> = SchemaCache::with_config(&config(0, 10));
        cache.insert("a".to_string(), 1);
        assert!(cache.get(&"a".to_string()).is_none());
        cache.evict_expired();
        assert!(cache.is_empty());
    }

    #[test]
    fn evicts_when_full() {
        let mut cache: SchemaCache<String, u32> = SchemaCache::with_config(&config(3600, 2));
        cache.insert("a".to_string(), 1);
        cache.insert("b".to_string(), 2);
        cache.insert("c".to_string(), 3);
        assert_eq!(cache.len(), 2);
        assert!(cache.contains(&"c".to_string()));

        // Re-inserting an existing key does not evict.
        cache.insert("c".to_string(), 4);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&"c".to_string()), Some(&4));

        cache.clear();
        assert!(cache.is_empty());
    }
}
