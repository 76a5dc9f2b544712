use crate::resilience::token_bucket::TokenBucket;
use crate::{Error, Result};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, Serialize)]
pub struct RateLimiterSnapshot {
    pub resource: String,
    pub enabled: bool,
    /// Tokens per second.
    pub refill_rate: f64,
    pub capacity: f64,
    pub tokens: f64,
    /// Estimated wait time until a token is available (ms), if currently empty.
    pub estimated_wait_ms: Option<u64>,
    pub acquired: u64,
    pub delayed: u64,
    pub timed_out: u64,
    pub total_wait_ms: u64,
}

#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    pub requests_per_minute: u32,
    /// Bucket capacity; `None` means one minute's worth of requests.
    pub burst: Option<u32>,
    /// Fail with [`Error::RateLimitTimeout`] rather than wait longer than this.
    pub max_wait: Option<Duration>,
    pub enabled: bool,
}

impl RateLimiterConfig {
    pub fn new() -> Self {
        Self::from_rpm(100)
    }

    pub fn from_rpm(requests_per_minute: u32) -> Self {
        Self {
            requests_per_minute,
            burst: None,
            max_wait: None,
            enabled: true,
        }
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::new()
        }
    }

    pub fn with_burst(mut self, burst: u32) -> Self {
        self.burst = Some(burst);
        self
    }

    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = Some(max_wait);
        self
    }

    /// Tokens per second.
    pub fn refill_rate(&self) -> f64 {
        self.requests_per_minute as f64 / 60.0
    }

    pub fn capacity(&self) -> f64 {
        self.burst.unwrap_or(self.requests_per_minute).max(1) as f64
    }
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Shapes outbound calls for one named resource with a [`TokenBucket`].
///
/// `acquire` waits for a token instead of rejecting, unless a `max_wait`
/// bound is configured. A disabled limiter admits every call immediately.
pub struct RateLimiter {
    resource: String,
    cfg: RateLimiterConfig,
    bucket: TokenBucket,
    acquired: AtomicU64,
    delayed: AtomicU64,
    timed_out: AtomicU64,
    total_wait_ms: AtomicU64,
}

impl RateLimiter {
    pub fn new(cfg: RateLimiterConfig) -> Self {
        Self::named("citation_api", cfg)
    }

    pub fn named(resource: impl Into<String>, cfg: RateLimiterConfig) -> Self {
        let bucket = TokenBucket::new(cfg.capacity(), cfg.refill_rate());
        Self {
            resource: resource.into(),
            cfg,
            bucket,
            acquired: AtomicU64::new(0),
            delayed: AtomicU64::new(0),
            timed_out: AtomicU64::new(0),
            total_wait_ms: AtomicU64::new(0),
        }
    }

    pub fn disabled() -> Self {
        Self::new(RateLimiterConfig::disabled())
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn is_enabled(&self) -> bool {
        self.cfg.enabled
    }

    /// Acquire one token, sleeping until one is available.
    pub async fn acquire(&self) -> Result<()> {
        if !self.cfg.enabled {
            return Ok(());
        }

        let waited = match self.cfg.max_wait {
            None => self.bucket.wait(1.0).await,
            Some(max_wait) => match self.bucket.wait_bounded(1.0, max_wait).await {
                Ok(waited) => waited,
                Err(waited) => {
                    self.timed_out.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        resource = %self.resource,
                        max_wait_ms = max_wait.as_millis() as u64,
                        "rate limit wait bound exceeded"
                    );
                    return Err(Error::RateLimitTimeout {
                        resource: self.resource.clone(),
                        waited: waited.max(max_wait),
                    });
                }
            },
        };

        self.acquired.fetch_add(1, Ordering::Relaxed);
        if !waited.is_zero() {
            self.delayed.fetch_add(1, Ordering::Relaxed);
            self.total_wait_ms
                .fetch_add(waited.as_millis() as u64, Ordering::Relaxed);
            debug!(
                resource = %self.resource,
                waited_ms = waited.as_millis() as u64,
                "rate limiter delayed request"
            );
        }
        Ok(())
    }

    /// Try to acquire a token without waiting, returns true if successful
    pub fn try_acquire(&self) -> bool {
        if !self.cfg.enabled {
            return true;
        }
        let ok = self.bucket.try_consume(1.0);
        if ok {
            self.acquired.fetch_add(1, Ordering::Relaxed);
        }
        ok
    }

    pub fn snapshot(&self) -> RateLimiterSnapshot {
        let tokens = self.bucket.available();
        let estimated_wait_ms = if self.cfg.enabled && tokens < 1.0 {
            let wait = self.bucket.wait_time_for(1.0);
            Some(u64::try_from(wait.as_millis()).unwrap_or(u64::MAX))
        } else {
            None
        };
        RateLimiterSnapshot {
            resource: self.resource.clone(),
            enabled: self.cfg.enabled,
            refill_rate: self.bucket.refill_rate(),
            capacity: self.bucket.capacity(),
            tokens,
            estimated_wait_ms,
            acquired: self.acquired.load(Ordering::Relaxed),
            delayed: self.delayed.load(Ordering::Relaxed),
            timed_out: self.timed_out.load(Ordering::Relaxed),
            total_wait_ms: self.total_wait_ms.load(Ordering::Relaxed),
        }
    }
}
