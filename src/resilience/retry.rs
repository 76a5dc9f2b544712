//! Retry with exponential backoff and full jitter.
//!
//! Only errors that [`Error::is_retryable`] are retried. Anything else is
//! returned on the spot with its identity intact; running out of attempts on
//! a retryable error yields [`Error::RetryExhausted`] wrapping the last cause.

use crate::{Error, Result};
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::{error, warn};

/// Configuration for retry logic
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Draw each delay uniformly from `[0, backoff]` instead of sleeping the full backoff.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            jitter: true,
        }
    }
}

impl RetryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }
}

/// Per-call retry bookkeeping.
#[derive(Debug, Clone)]
pub struct RetryContext {
    /// 1-based number of the attempt in progress.
    pub attempt: u32,
    pub max_attempts: u32,
    pub total_delay: Duration,
}

pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Upper bound of the delay after failed attempt `attempt` (1-based):
    /// `min(base_delay * 2^(attempt-1), max_delay)`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(31);
        self.config
            .base_delay
            .saturating_mul(1u32 << exp)
            .min(self.config.max_delay)
    }

    /// Delay to actually sleep after failed attempt `attempt`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let cap = self.backoff(attempt);
        if !self.config.jitter || cap.is_zero() {
            return cap;
        }
        let factor: f64 = rand::thread_rng().gen_range(0.0..=1.0);
        cap.mul_f64(factor).min(cap)
    }

    /// Delay before the next attempt, or `None` if `error` ends the call.
    pub fn should_retry(&self, ctx: &RetryContext, error: &Error) -> Option<Duration> {
        if ctx.attempt >= ctx.max_attempts || !error.is_retryable() {
            return None;
        }
        Some(self.delay_for(ctx.attempt))
    }

    /// Run `operation` until it succeeds, fails permanently, or attempts run out.
    pub async fn run<F, Fut, T>(&self, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut ctx = RetryContext {
            attempt: 1,
            max_attempts: self.config.max_attempts.max(1),
            total_delay: Duration::ZERO,
        };

        loop {
            let err = match operation().await {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };

            if !err.is_retryable() {
                return Err(err);
            }

            match self.should_retry(&ctx, &err) {
                Some(delay) => {
                    warn!(
                        attempt = ctx.attempt,
                        max_attempts = ctx.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "retrying after transient failure"
                    );
                    tokio::time::sleep(delay).await;
                    ctx.total_delay += delay;
                    ctx.attempt += 1;
                }
                None => {
                    error!(
                        attempts = ctx.attempt,
                        total_delay_ms = ctx.total_delay.as_millis() as u64,
                        error = %err,
                        "retries exhausted"
                    );
                    return Err(Error::RetryExhausted {
                        attempts: ctx.attempt,
                        last: Box::new(err),
                    });
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(RetryConfig::default())
    }
}
