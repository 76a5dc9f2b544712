//! 日志模块：基于 tracing 的结构化日志初始化。
//!
//! # Logging
//!
//! The library only emits `tracing` events; installing a subscriber is the
//! application's call. [`init_logging`] is a convenience for binaries and
//! demos that want the usual formatter with an env-driven filter.
//!
//! | Event | Level |
//! |-------|-------|
//! | Circuit opened | `warn` |
//! | Circuit half-open / closed | `info` |
//! | Retry scheduled | `warn` |
//! | Retries exhausted | `error` |
//! | Stale cache fallback attempted | `warn` |
//! | Stale cache served | `info` |
//! | Fallback impossible (no cached data) | `error` |
//! | Cache hit, rate-limit delay, eviction | `debug` |

use crate::config::ClientConfig;
use tracing_subscriber::EnvFilter;

/// Install a global fmt subscriber.
///
/// `RUST_LOG` wins when set; otherwise `default_level` (e.g. `"info"` or
/// `"enriched_citation_client=debug"`) is used. Returns `false` if a global
/// subscriber was already installed, which is not an error.
pub fn init_logging(default_level: &str) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}

/// [`init_logging`] with the configured `log_level`.
pub fn init_from_config(config: &ClientConfig) -> bool {
    init_logging(&config.log_level)
}
