//! Capacity-bounded cache tier with least-recently-used eviction.
//!
//! Entries never expire. Reads and writes both count as use.

use super::stats::{AtomicStats, CacheStats};
use super::ttl::CachedEntry;
use ::lru::LruCache as Lru;
use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug)]
struct Entry<V> {
    value: V,
    created_at: Instant,
    hit_count: u64,
}

pub struct LruCache<V> {
    capacity: NonZeroUsize,
    entries: Mutex<Lru<String, Entry<V>>>,
    stats: AtomicStats,
}

impl<V: Clone> LruCache<V> {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            capacity,
            entries: Mutex::new(Lru::new(capacity)),
            stats: AtomicStats::default(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    fn lock(&self) -> MutexGuard<'_, Lru<String, Entry<V>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert or replace `key` and mark it most recently used.
    pub fn set(&self, key: impl Into<String>, value: V) {
        let key = key.into();
        let entry = Entry {
            value,
            created_at: Instant::now(),
            hit_count: 0,
        };
        let displaced = self.lock().push(key.clone(), entry);
        self.stats.set();
        if let Some((old_key, _)) = displaced {
            if old_key != key {
                self.stats.evicted();
                debug!(key = %old_key, "evicted least recently used search entry");
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<V> {
        self.get_with_metadata(key).map(|e| e.value)
    }

    /// Look up `key`, promoting it to most recently used. Never stale.
    pub fn get_with_metadata(&self, key: &str) -> Option<CachedEntry<V>> {
        let mut entries = self.lock();
        match entries.get_mut(key) {
            Some(entry) => {
                self.stats.hit();
                entry.hit_count += 1;
                Some(CachedEntry {
                    value: entry.value.clone(),
                    is_stale: false,
                    age: entry.created_at.elapsed(),
                    hit_count: entry.hit_count,
                    expires_in: None,
                })
            }
            None => {
                self.stats.miss();
                None
            }
        }
    }

    /// Whether `key` is present, without touching recency.
    pub fn contains(&self, key: &str) -> bool {
        self.lock().contains(key)
    }

    pub fn invalidate(&self, key: &str) -> bool {
        self.lock().pop(key).is_some()
    }

    pub fn clear(&self) {
        self.lock().clear();
        self.stats.reset();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.to_stats(self.len(), self.capacity())
    }
}
