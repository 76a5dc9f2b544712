//! Time-bounded cache tier.
//!
//! Expired entries stay in place until they are overwritten, purged or
//! evicted, so that a caller that explicitly allows stale reads can still be
//! served when the upstream is down.

use super::stats::{AtomicStats, CacheStats};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// A value read from a cache tier together with its bookkeeping.
#[derive(Debug, Clone)]
pub struct CachedEntry<V> {
    pub value: V,
    pub is_stale: bool,
    pub age: Duration,
    pub hit_count: u64,
    /// `None` for tiers without expiry.
    pub expires_in: Option<Duration>,
}

impl<V> CachedEntry<V> {
    /// Age in seconds, rounded to one decimal place.
    pub fn age_seconds(&self) -> f64 {
        (self.age.as_secs_f64() * 10.0).round() / 10.0
    }
}

#[derive(Debug)]
struct Entry<V> {
    value: V,
    created_at: Instant,
    expires_at: Instant,
    hit_count: u64,
}

/// Cap for TTLs too large to represent as an `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

fn expiry(now: Instant, ttl: Duration) -> Instant {
    now.checked_add(ttl)
        .or_else(|| now.checked_add(FAR_FUTURE))
        .unwrap_or(now)
}

impl<V> Entry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

pub struct TtlCache<V> {
    default_ttl: Duration,
    max_entries: usize,
    entries: Mutex<HashMap<String, Entry<V>>>,
    stats: AtomicStats,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(default_ttl: Duration, max_entries: usize) -> Self {
        Self {
            default_ttl,
            max_entries: max_entries.max(1),
            entries: Mutex::new(HashMap::new()),
            stats: AtomicStats::default(),
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Entry<V>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store `value` with the default TTL.
    pub fn insert(&self, key: impl Into<String>, value: V) {
        self.set(key, value, self.default_ttl);
    }

    /// Store `value`, replacing any previous entry and restarting its clock.
    pub fn set(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let key = key.into();
        let now = Instant::now();
        let mut entries = self.lock();

        if !entries.contains_key(&key) && entries.len() >= self.max_entries {
            let before = entries.len();
            entries.retain(|_, e| !e.is_expired(now));
            for _ in entries.len()..before {
                self.stats.evicted();
            }
            if entries.len() >= self.max_entries {
                let oldest = entries
                    .iter()
                    .min_by_key(|(_, e)| e.created_at)
                    .map(|(k, _)| k.clone());
                if let Some(oldest) = oldest {
                    entries.remove(&oldest);
                    self.stats.evicted();
                    debug!(key = %oldest, "evicted oldest metadata cache entry");
                }
            }
        }

        entries.insert(
            key,
            Entry {
                value,
                created_at: now,
                expires_at: expiry(now, ttl),
                hit_count: 0,
            },
        );
        self.stats.set();
    }

    pub fn get(&self, key: &str, allow_stale: bool) -> Option<V> {
        self.get_with_metadata(key, allow_stale).map(|e| e.value)
    }

    /// Look up `key`. A fresh entry is always returned; an expired one only
    /// when `allow_stale` is set, flagged `is_stale`.
    ///
    /// A plain read of an expired entry counts as a miss but does not evict
    /// it: the entry stays available to a later stale read until it is
    /// overwritten, purged by [`purge_expired`](Self::purge_expired) or pushed
    /// out by capacity pressure.
    pub fn get_with_metadata(&self, key: &str, allow_stale: bool) -> Option<CachedEntry<V>> {
        let now = Instant::now();
        let mut entries = self.lock();
        let Some(entry) = entries.get_mut(key) else {
            self.stats.miss();
            return None;
        };

        let is_stale = entry.is_expired(now);
        if is_stale && !allow_stale {
            self.stats.miss();
            return None;
        }
        if is_stale {
            self.stats.stale_hit();
            warn!(
                key,
                age_ms = now.saturating_duration_since(entry.created_at).as_millis() as u64,
                "serving expired cache entry"
            );
        } else {
            self.stats.hit();
        }
        entry.hit_count += 1;
        Some(CachedEntry {
            value: entry.value.clone(),
            is_stale,
            age: now.saturating_duration_since(entry.created_at),
            hit_count: entry.hit_count,
            expires_in: Some(entry.expires_at.saturating_duration_since(now)),
        })
    }

    pub fn invalidate(&self, key: &str) -> bool {
        self.lock().remove(key).is_some()
    }

    pub fn clear(&self) {
        self.lock().clear();
        self.stats.reset();
    }

    /// Drop every expired entry; returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, e| !e.is_expired(now));
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.to_stats(self.len(), self.max_entries)
    }
}
