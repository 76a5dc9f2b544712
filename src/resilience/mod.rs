//! 弹性模式模块：令牌桶、限流器、熔断器与重试策略。
//!
//! # Resilience Primitives Module
//!
//! Building blocks the facade composes around every upstream call, in this
//! order: rate limiter, then circuit breaker, then retry around the raw call.
//! A retry sequence therefore reaches the breaker as a single outcome.
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`token_bucket`] | Continuous-refill token bucket |
//! | [`rate_limiter`] | Named limiter that waits for tokens instead of rejecting |
//! | [`circuit_breaker`] | Closed / open / half-open failure isolation |
//! | [`retry`] | Exponential backoff with full jitter for transient errors |
//!
//! ## Circuit Breaker
//!
//! - **Closed**: calls pass; consecutive failures are counted
//! - **Open**: calls fail fast with `CircuitOpen` until the recovery timeout elapses
//! - **Half-Open**: a few probes pass; enough successes close, any failure reopens
//!
//! ```rust
//! use enriched_citation_client::resilience::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};
//! use std::time::Duration;
//!
//! let breaker = CircuitBreaker::new(
//!     CircuitBreakerConfig::new()
//!         .with_failure_threshold(3)
//!         .with_recovery_timeout(Duration::from_secs(30)),
//! );
//! assert_eq!(breaker.state().as_str(), "closed");
//! ```
//!
//! ## Rate Limiter
//!
//! ```rust
//! use enriched_citation_client::resilience::rate_limiter::{RateLimiter, RateLimiterConfig};
//!
//! let limiter = RateLimiter::new(RateLimiterConfig::from_rpm(100).with_burst(10));
//! assert!(limiter.try_acquire());
//! ```

pub mod circuit_breaker;
pub mod rate_limiter;
pub mod retry;
pub mod token_bucket;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerSnapshot, CircuitState};
pub use rate_limiter::{RateLimiter, RateLimiterConfig, RateLimiterSnapshot};
pub use retry::{RetryConfig, RetryContext, RetryPolicy};
pub use token_bucket::TokenBucket;
