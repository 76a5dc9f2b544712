use crate::cache::{CacheConfig, CacheManager};
use crate::client::core::ResilientClient;
use crate::config::ClientConfig;
use crate::resilience::{
    CircuitBreaker, CircuitBreakerConfig, RateLimiter, RateLimiterConfig, RetryConfig, RetryPolicy,
};
use crate::transport::{CitationApi, HttpTransport};
use crate::Result;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::debug;

/// Builder for creating clients with custom configuration.
///
/// Everything not injected explicitly is derived from the [`ClientConfig`].
/// Injecting the same breaker, limiter or cache into several clients makes
/// them share that component.
pub struct ResilientClientBuilder {
    config: ClientConfig,
    upstream: Option<Arc<dyn CitationApi>>,
    breaker: Option<Arc<CircuitBreaker>>,
    rate_limiter: Option<Arc<RateLimiter>>,
    cache: Option<Arc<CacheManager>>,
}

impl ResilientClientBuilder {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            upstream: None,
            breaker: None,
            rate_limiter: None,
            cache: None,
        }
    }

    /// Replace the HTTP transport, e.g. with a scripted upstream in tests.
    pub fn upstream(mut self, upstream: Arc<dyn CitationApi>) -> Self {
        self.upstream = Some(upstream);
        self
    }

    /// Use an existing circuit breaker. Ignored when the breaker is disabled
    /// in the configuration.
    pub fn circuit_breaker(mut self, breaker: Arc<CircuitBreaker>) -> Self {
        self.breaker = Some(breaker);
        self
    }

    pub fn rate_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.rate_limiter = Some(limiter);
        self
    }

    pub fn cache(mut self, cache: Arc<CacheManager>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn build(self) -> Result<ResilientClient> {
        let config = self.config;
        config.validate()?;

        let upstream: Arc<dyn CitationApi> = match self.upstream {
            Some(upstream) => upstream,
            None => Arc::new(HttpTransport::new(&config)?),
        };

        let breaker = if config.circuit_breaker_enabled {
            Some(self.breaker.unwrap_or_else(|| {
                Arc::new(CircuitBreaker::named(
                    upstream.name(),
                    CircuitBreakerConfig::new()
                        .with_failure_threshold(config.circuit_failure_threshold)
                        .with_recovery_timeout(config.circuit_recovery_timeout())
                        .with_success_threshold(config.circuit_success_threshold)
                        .with_half_open_max_calls(config.circuit_half_open_max_calls),
                ))
            }))
        } else {
            None
        };

        let rate_limiter = self.rate_limiter.unwrap_or_else(|| {
            let cfg = if config.rate_limiting_enabled {
                let mut cfg = RateLimiterConfig::from_rpm(config.rate_limit_per_minute);
                if let Some(burst) = config.rate_limit_burst {
                    cfg = cfg.with_burst(burst);
                }
                if let Some(max_wait) = config.rate_limit_max_wait() {
                    cfg = cfg.with_max_wait(max_wait);
                }
                cfg
            } else {
                RateLimiterConfig::disabled()
            };
            Arc::new(RateLimiter::named(upstream.name(), cfg))
        });

        let retry = Arc::new(RetryPolicy::new(
            RetryConfig::new()
                .with_max_attempts(config.retry_max_attempts)
                .with_base_delay(config.retry_base_delay_duration())
                .with_max_delay(config.retry_max_delay_duration())
                .with_jitter(config.retry_jitter),
        ));

        let cache = self
            .cache
            .unwrap_or_else(|| Arc::new(CacheManager::new(CacheConfig::from_client_config(&config))));

        let inflight = config.max_inflight.map(|n| Arc::new(Semaphore::new(n.max(1))));

        debug!(
            upstream = upstream.name(),
            breaker = breaker.is_some(),
            rate_limiting = rate_limiter.is_enabled(),
            cache = cache.is_enabled(),
            "resilient client built"
        );

        Ok(ResilientClient {
            config: Arc::new(config),
            upstream,
            cache,
            breaker,
            rate_limiter,
            retry,
            inflight,
        })
    }
}
