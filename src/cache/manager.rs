//! Cache manager.
//!
//! Owns both tiers and routes each operation to its tier: field metadata
//! goes to the TTL tier, search results to the LRU tier. When caching is
//! disabled every lookup misses and every write is dropped.

use super::key::{CacheKey, CacheKeyGenerator};
use super::lru::LruCache;
use super::stats::CacheStats;
use super::ttl::{CachedEntry, TtlCache};
use crate::config::ClientConfig;
use crate::types::SearchRequest;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub enabled: bool,
    pub metadata_ttl: Duration,
    pub metadata_max_entries: usize,
    pub search_capacity: usize,
    /// Mixed into every key; usually the upstream base URL.
    pub key_salt: Option<String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            metadata_ttl: Duration::from_secs(3600),
            metadata_max_entries: 10,
            search_capacity: 100,
            key_salt: None,
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_client_config(config: &ClientConfig) -> Self {
        Self {
            enabled: config.cache_enabled,
            metadata_ttl: config.ttl_cache_duration(),
            metadata_max_entries: config.metadata_cache_max_entries,
            search_capacity: config.lru_cache_capacity,
            key_salt: Some(config.base_url.clone()),
        }
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_metadata_ttl(mut self, ttl: Duration) -> Self {
        self.metadata_ttl = ttl;
        self
    }

    pub fn with_search_capacity(mut self, capacity: usize) -> Self {
        self.search_capacity = capacity;
        self
    }
}

/// Which tier an operation's responses live in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheTier {
    Metadata,
    Search,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TieredCacheStats {
    pub enabled: bool,
    pub metadata: CacheStats,
    pub search: CacheStats,
}

pub struct CacheManager {
    config: CacheConfig,
    keys: CacheKeyGenerator,
    metadata: TtlCache<Value>,
    search: LruCache<Value>,
}

impl CacheManager {
    pub fn new(config: CacheConfig) -> Self {
        let keys = match &config.key_salt {
            Some(salt) => CacheKeyGenerator::new().with_salt(salt.clone()),
            None => CacheKeyGenerator::new(),
        };
        Self {
            metadata: TtlCache::new(config.metadata_ttl, config.metadata_max_entries),
            search: LruCache::new(config.search_capacity),
            keys,
            config,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn fields_key(&self) -> CacheKey {
        self.keys.fields()
    }

    pub fn search_key(&self, request: &SearchRequest) -> CacheKey {
        self.keys.search(request)
    }

    /// Fresh entry only: an unexpired metadata entry or any search entry.
    pub fn get_fresh(&self, tier: CacheTier, key: &CacheKey) -> Option<CachedEntry<Value>> {
        if !self.config.enabled {
            return None;
        }
        let key = key.as_string();
        match tier {
            CacheTier::Metadata => self.metadata.get_with_metadata(&key, false),
            CacheTier::Search => self.search.get_with_metadata(&key),
        }
    }

    /// Any entry, expired or not; used for degraded answers.
    pub fn get_stale(&self, tier: CacheTier, key: &CacheKey) -> Option<CachedEntry<Value>> {
        if !self.config.enabled {
            return None;
        }
        let key = key.as_string();
        match tier {
            CacheTier::Metadata => self.metadata.get_with_metadata(&key, true),
            CacheTier::Search => self.search.get_with_metadata(&key),
        }
    }

    pub fn store(&self, tier: CacheTier, key: &CacheKey, value: Value) {
        if !self.config.enabled {
            return;
        }
        match tier {
            CacheTier::Metadata => self.metadata.insert(key.as_string(), value),
            CacheTier::Search => self.search.set(key.as_string(), value),
        }
    }

    pub fn invalidate(&self, tier: CacheTier, key: &CacheKey) -> bool {
        let key = key.as_string();
        match tier {
            CacheTier::Metadata => self.metadata.invalidate(&key),
            CacheTier::Search => self.search.invalidate(&key),
        }
    }

    pub fn purge_expired(&self) -> usize {
        self.metadata.purge_expired()
    }

    pub fn clear_all(&self) {
        self.metadata.clear();
        self.search.clear();
    }

    pub fn stats(&self) -> TieredCacheStats {
        TieredCacheStats {
            enabled: self.config.enabled,
            metadata: self.metadata.stats(),
            search: self.search.stats(),
        }
    }
}
