use crate::cache::{CacheManager, CacheTier, TieredCacheStats};
use crate::config::ClientConfig;
use crate::resilience::{CircuitBreaker, RateLimiter, RetryPolicy};
use crate::transport::CitationApi;
use crate::types::{ApiResponse, SearchRequest};
use crate::{Error, ErrorContext, Result};
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Citation API client with rate limiting, circuit breaking, retries and a
/// two-tier cache that can answer from stale data while the upstream is down.
///
/// Cloning is cheap; clones share every resilience component.
#[derive(Clone)]
pub struct ResilientClient {
    pub(crate) config: Arc<ClientConfig>,
    pub(crate) upstream: Arc<dyn CitationApi>,
    pub(crate) cache: Arc<CacheManager>,
    pub(crate) breaker: Option<Arc<CircuitBreaker>>,
    pub(crate) rate_limiter: Arc<RateLimiter>,
    pub(crate) retry: Arc<RetryPolicy>,
    pub(crate) inflight: Option<Arc<Semaphore>>,
}

impl ResilientClient {
    /// Client over the real HTTP upstream.
    pub fn new(config: ClientConfig) -> Result<Self> {
        crate::client::builder::ResilientClientBuilder::new(config).build()
    }

    /// Client configured entirely from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env()?)
    }

    pub fn builder(config: ClientConfig) -> crate::client::builder::ResilientClientBuilder {
        crate::client::builder::ResilientClientBuilder::new(config)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn circuit_breaker(&self) -> Option<&CircuitBreaker> {
        self.breaker.as_deref()
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    pub fn cache(&self) -> &CacheManager {
        &self.cache
    }

    pub fn cache_stats(&self) -> TieredCacheStats {
        self.cache.stats()
    }

    pub fn clear_caches(&self) {
        self.cache.clear_all();
    }

    /// Metadata about the searchable fields (TTL tier).
    pub async fn get_fields(&self) -> Result<ApiResponse> {
        let key = self.cache.fields_key();
        self.execute_protected("get_fields", CacheTier::Metadata, &key, |request_id| {
            let upstream = &self.upstream;
            async move { upstream.fetch_fields(&request_id).await }
        })
        .await
    }

    /// One page of citation records (LRU tier).
    ///
    /// Invalid requests are rejected before any limiter, breaker or cache is
    /// consulted.
    pub async fn search_records(&self, request: &SearchRequest) -> Result<ApiResponse> {
        request.validate()?;
        let key = self.cache.search_key(request);
        self.execute_protected("search_records", CacheTier::Search, &key, |request_id| {
            let upstream = &self.upstream;
            async move { upstream.search(request, &request_id).await }
        })
        .await
    }

    /// Convenience form of [`search_records`](Self::search_records).
    pub async fn search_citations(
        &self,
        criteria: &str,
        fields: &[&str],
        start: u32,
        rows: u32,
    ) -> Result<ApiResponse> {
        let request = SearchRequest::new(criteria)
            .with_fields(fields.iter().copied())
            .with_start(start)
            .with_rows(rows);
        self.search_records(&request).await
    }

    /// The single record whose `id` is `citation_id`.
    ///
    /// The returned response carries the record as its body and keeps the
    /// degraded marker if the page came from stale cache.
    pub async fn get_citation_details(&self, citation_id: &str) -> Result<ApiResponse> {
        let id = citation_id.trim();
        if id.is_empty() {
            return Err(Error::validation_with_context(
                "Citation ID is required",
                ErrorContext::new()
                    .with_field_path("citation_id")
                    .with_source("request_validator"),
            ));
        }

        let request = SearchRequest::new(format!("id:{}", id)).with_rows(1);
        let page = self.search_records(&request).await?;
        let doc = page
            .docs()
            .first()
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("Citation not found: {}", id)))?;
        Ok(ApiResponse {
            data: doc,
            source: page.source,
            cache_status: page.cache_status,
        })
    }
}
