//! # enriched-citation-client
//!
//! 面向 USPTO 增强引用 API 的弹性客户端：限流、熔断、重试与两级缓存降级。
//!
//! Resilient client for the USPTO Enriched Citation API. Every upstream call
//! is shaped by a token-bucket rate limiter, guarded by a circuit breaker,
//! retried on transient failures, and backed by a two-tier cache that keeps
//! answering from stale data while the upstream is unavailable.
//!
//! ## Call Path
//!
//! 1. Validate the request (invalid requests never reach the upstream).
//! 2. Serve a fresh cache hit, unless the circuit is open.
//! 3. Wait for a rate-limit token.
//! 4. Circuit breaker around retry around the raw HTTP call.
//! 5. On success, write through to the cache tier.
//! 6. On an open circuit or exhausted retries, answer from stale cache with a
//!    `_cache_status` marker, or surface the error if nothing is cached.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use enriched_citation_client::{ClientConfig, ResilientClient, SearchRequest};
//!
//! #[tokio::main]
//! async fn main() -> enriched_citation_client::Result<()> {
//!     let client = ResilientClient::new(ClientConfig::from_env()?)?;
//!
//!     let fields = client.get_fields().await?;
//!     println!("{}", fields.data);
//!
//!     let page = client
//!         .search_records(&SearchRequest::new("techCenter:2800").with_rows(10))
//!         .await?;
//!     if page.is_degraded() {
//!         eprintln!("served from stale cache");
//!     }
//!     println!("{} docs", page.docs().len());
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | Resilient facade and its builder |
//! | [`resilience`] | Token bucket, rate limiter, circuit breaker, retry |
//! | [`cache`] | TTL and LRU tiers, keys and statistics |
//! | [`transport`] | Upstream trait and reqwest implementation |
//! | [`types`] | Search requests, responses and the degraded marker |
//! | [`config`] | Configuration from code, YAML or environment |
//! | [`telemetry`] | Logging setup |
//! | [`error_code`] | Stable error classification |

pub mod cache;
pub mod client;
pub mod config;
pub mod error_code;
pub mod resilience;
pub mod telemetry;
pub mod transport;
pub mod types;
pub mod utils;

// Re-export main types for convenience
pub use client::{ResilientClient, ResilientClientBuilder, SignalsSnapshot};
pub use config::ClientConfig;
pub use error_code::StandardErrorCode;
pub use transport::{CitationApi, HttpTransport};
pub use types::{ApiResponse, CacheStatus, ResponseSource, SearchRequest};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext};
