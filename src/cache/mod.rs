//! 响应缓存模块：元数据 TTL 缓存与检索结果 LRU 缓存。
//!
//! # Response Caching Module
//!
//! Two in-memory tiers sized for the two kinds of upstream data:
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`TtlCache`] | Time-bounded tier for field metadata; expired entries remain readable as stale |
//! | [`LruCache`] | Capacity-bounded tier for search results; least recently used evicted first |
//! | [`CacheManager`] | Routes reads and writes to the right tier, honours `cache_enabled` |
//! | [`CacheKeyGenerator`] | SHA-256 keys over canonical request parameters |
//! | [`CacheStats`] | Hits, misses, evictions and fill level per tier |
//!
//! ## Example
//!
//! ```rust
//! use enriched_citation_client::cache::TtlCache;
//! use std::time::Duration;
//!
//! let cache = TtlCache::new(Duration::from_secs(3600), 10);
//! cache.insert("fields", 42);
//! assert_eq!(cache.get("fields", false), Some(42));
//! ```

mod key;
mod lru;
mod manager;
mod stats;
mod ttl;

pub use key::{CacheKey, CacheKeyGenerator};
pub use lru::LruCache;
pub use manager::{CacheConfig, CacheManager, CacheTier, TieredCacheStats};
pub use stats::CacheStats;
pub use ttl::{CachedEntry, TtlCache};
