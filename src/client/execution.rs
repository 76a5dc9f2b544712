//! 请求执行逻辑：限流、熔断、重试与缓存降级的组合。
//!
//! Protected execution: cache read-through, then rate limiter, circuit
//! breaker and retry around the raw call, then write-through or stale
//! fallback.

use crate::cache::{CacheKey, CacheTier};
use crate::types::response::{CIRCUIT_OPEN_MESSAGE, RETRY_EXHAUSTED_MESSAGE};
use crate::types::{ApiResponse, CacheStatus};
use crate::{Error, Result};
use serde_json::Value;
use std::future::Future;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::core::ResilientClient;

impl ResilientClient {
    pub(crate) async fn execute_protected<F, Fut>(
        &self,
        operation: &'static str,
        tier: CacheTier,
        key: &CacheKey,
        call: F,
    ) -> Result<ApiResponse>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<Value>>,
    {
        if self.read_through_allowed() {
            if let Some(hit) = self.cache.get_fresh(tier, key) {
                debug!(operation, key = %key, hit_count = hit.hit_count, "cache hit");
                return Ok(ApiResponse::cached(hit.value));
            }
        }

        let request_id = Uuid::new_v4().to_string();
        let started = Instant::now();
        let _permit = self.preflight().await?;

        let attempt = || self.attempt_once(&call, &request_id);
        let result = match &self.breaker {
            Some(breaker) => breaker.call(|| self.retry.run(attempt)).await,
            None => self.retry.run(attempt).await,
        };

        match result {
            Ok(value) => {
                self.cache.store(tier, key, value.clone());
                debug!(
                    operation,
                    request_id = %request_id,
                    duration_ms = started.elapsed().as_millis() as u64,
                    "upstream call succeeded"
                );
                Ok(ApiResponse::upstream(value))
            }
            Err(err) if err.is_degradable() => self.degrade(operation, tier, key, err),
            Err(err) => {
                debug!(
                    operation,
                    request_id = %request_id,
                    code = err.standard_code().code(),
                    "upstream call failed"
                );
                Err(err)
            }
        }
    }

    /// One raw call bounded by the request timeout.
    async fn attempt_once<F, Fut>(&self, call: &F, request_id: &str) -> Result<Value>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<Value>>,
    {
        let timeout = self.config.request_timeout();
        match tokio::time::timeout(timeout, call(request_id.to_string())).await {
            Ok(result) => result,
            Err(_) => Err(Error::timeout(timeout).with_request_id(request_id)),
        }
    }

    fn degrade(
        &self,
        operation: &'static str,
        tier: CacheTier,
        key: &CacheKey,
        err: Error,
    ) -> Result<ApiResponse> {
        let circuit = if err.is_circuit_open() {
            "open"
        } else {
            self.breaker
                .as_ref()
                .map_or("disabled", |b| b.state().as_str())
        };
        warn!(
            operation,
            circuit,
            error = %err,
            "upstream unavailable, attempting stale cache fallback"
        );

        let Some(entry) = self.cache.get_stale(tier, key) else {
            error!(operation, circuit, "no cached data available for fallback");
            return Err(err);
        };

        let message = if err.is_circuit_open() {
            CIRCUIT_OPEN_MESSAGE
        } else {
            RETRY_EXHAUSTED_MESSAGE
        };
        info!(
            operation,
            age_seconds = entry.age_seconds(),
            hit_count = entry.hit_count,
            expired = entry.is_stale,
            "serving cached data in degraded mode"
        );
        Ok(ApiResponse::degraded(
            entry.value,
            CacheStatus::stale(entry.age.as_secs_f64(), message, circuit),
        ))
    }
}
