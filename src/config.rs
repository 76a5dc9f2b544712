//! Client configuration.
//!
//! A [`ClientConfig`] can be built in code, parsed from YAML, or read from the
//! process environment. Every field has a default, so a YAML document only
//! needs the keys it wants to change.
//!
//! | Environment variable          | Field                               |
//! |-------------------------------|-------------------------------------|
//! | `USPTO_API_KEY`               | `api_key`                           |
//! | `USPTO_BASE_URL`              | `base_url`                          |
//! | `API_TIMEOUT`                 | `request_timeout_seconds`           |
//! | `CONNECT_TIMEOUT`             | `connect_timeout_seconds`           |
//! | `ECITATION_RATE_LIMIT`        | `rate_limit_per_minute`             |
//! | `RATE_LIMITING_ENABLED`       | `rate_limiting_enabled`             |
//! | `CIRCUIT_BREAKER_ENABLED`     | `circuit_breaker_enabled`           |
//! | `CIRCUIT_FAILURE_THRESHOLD`   | `circuit_failure_threshold`         |
//! | `CIRCUIT_RECOVERY_TIMEOUT`    | `circuit_recovery_timeout_seconds`  |
//! | `CIRCUIT_SUCCESS_THRESHOLD`   | `circuit_success_threshold`         |
//! | `RETRY_MAX_ATTEMPTS`          | `retry_max_attempts`                |
//! | `RETRY_BASE_DELAY`            | `retry_base_delay`                  |
//! | `RETRY_MAX_DELAY`             | `retry_max_delay`                   |
//! | `ENABLE_CACHE`                | `cache_enabled`                     |
//! | `FIELDS_CACHE_TTL`            | `ttl_cache_seconds`                 |
//! | `SEARCH_CACHE_SIZE`           | `lru_cache_capacity`                |
//! | `LOG_LEVEL`                   | `log_level`                         |
//! | `REQUEST_ID_HEADER`           | `request_id_header`                 |

use crate::error::{Error, ErrorContext};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://developer.uspto.gov/ds-api";
pub const DEFAULT_REQUEST_ID_HEADER: &str = "X-Request-ID";
pub const DEFAULT_MAX_RESPONSE_BYTES: u64 = 50 * 1024 * 1024;
pub const DEFAULT_RESPONSE_WARN_BYTES: u64 = 10 * 1024 * 1024;
/// Upper bound for every duration setting (ten years).
pub const MAX_DURATION_SECONDS: f64 = 10.0 * 365.0 * 24.0 * 60.0 * 60.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub base_url: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub request_timeout_seconds: f64,
    pub connect_timeout_seconds: f64,
    pub request_id_header: String,
    pub log_level: String,
    pub max_response_bytes: u64,
    pub response_warn_bytes: u64,
    /// Upper bound on concurrent upstream calls; `None` means unbounded.
    pub max_inflight: Option<usize>,

    pub rate_limiting_enabled: bool,
    pub rate_limit_per_minute: u32,
    /// Bucket capacity; defaults to `rate_limit_per_minute`.
    pub rate_limit_burst: Option<u32>,
    /// Longest a caller may wait for a token before failing.
    pub rate_limit_max_wait_seconds: Option<f64>,

    pub circuit_breaker_enabled: bool,
    pub circuit_failure_threshold: u32,
    pub circuit_recovery_timeout_seconds: f64,
    pub circuit_success_threshold: u32,
    pub circuit_half_open_max_calls: u32,

    pub retry_max_attempts: u32,
    pub retry_base_delay: f64,
    pub retry_max_delay: f64,
    pub retry_jitter: bool,

    pub cache_enabled: bool,
    pub ttl_cache_seconds: f64,
    pub metadata_cache_max_entries: usize,
    pub lru_cache_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            request_timeout_seconds: 30.0,
            connect_timeout_seconds: 10.0,
            request_id_header: DEFAULT_REQUEST_ID_HEADER.to_string(),
            log_level: "info".to_string(),
            max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
            response_warn_bytes: DEFAULT_RESPONSE_WARN_BYTES,
            max_inflight: None,
            rate_limiting_enabled: true,
            rate_limit_per_minute: 100,
            rate_limit_burst: None,
            rate_limit_max_wait_seconds: None,
            circuit_breaker_enabled: true,
            circuit_failure_threshold: 3,
            circuit_recovery_timeout_seconds: 30.0,
            circuit_success_threshold: 2,
            circuit_half_open_max_calls: 2,
            retry_max_attempts: 3,
            retry_base_delay: 1.0,
            retry_max_delay: 30.0,
            retry_jitter: true,
            cache_enabled: true,
            ttl_cache_seconds: 3600.0,
            metadata_cache_max_entries: 10,
            lru_cache_capacity: 100,
        }
    }
}

impl ClientConfig {
    /// Defaults tuned for tests: no jitter, tiny delays, no rate limiting.
    pub fn for_tests() -> Self {
        Self {
            rate_limiting_enabled: false,
            retry_base_delay: 0.01,
            retry_max_delay: 0.05,
            retry_jitter: false,
            ..Self::default()
        }
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&raw)
    }

    /// Defaults overlaid with whatever the environment sets.
    pub fn from_env() -> Result<Self> {
        let config = Self::default().apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Overlay environment variables on top of this configuration.
    ///
    /// A variable that is set but cannot be parsed is a configuration error,
    /// not silently ignored.
    pub fn apply_env(mut self) -> Result<Self> {
        if let Some(key) = env_string("USPTO_API_KEY") {
            self.api_key = Some(key);
        }
        if let Some(url) = env_string("USPTO_BASE_URL") {
            self.base_url = url;
        }
        if let Some(v) = env_parse("API_TIMEOUT")? {
            self.request_timeout_seconds = v;
        }
        if let Some(v) = env_parse("CONNECT_TIMEOUT")? {
            self.connect_timeout_seconds = v;
        }
        if let Some(v) = env_parse("ECITATION_RATE_LIMIT")? {
            self.rate_limit_per_minute = v;
        }
        if let Some(v) = env_bool("RATE_LIMITING_ENABLED")? {
            self.rate_limiting_enabled = v;
        }
        if let Some(v) = env_bool("CIRCUIT_BREAKER_ENABLED")? {
            self.circuit_breaker_enabled = v;
        }
        if let Some(v) = env_parse("CIRCUIT_FAILURE_THRESHOLD")? {
            self.circuit_failure_threshold = v;
        }
        if let Some(v) = env_parse("CIRCUIT_RECOVERY_TIMEOUT")? {
            self.circuit_recovery_timeout_seconds = v;
        }
        if let Some(v) = env_parse("CIRCUIT_SUCCESS_THRESHOLD")? {
            self.circuit_success_threshold = v;
        }
        if let Some(v) = env_parse("RETRY_MAX_ATTEMPTS")? {
            self.retry_max_attempts = v;
        }
        if let Some(v) = env_parse("RETRY_BASE_DELAY")? {
            self.retry_base_delay = v;
        }
        if let Some(v) = env_parse("RETRY_MAX_DELAY")? {
            self.retry_max_delay = v;
        }
        if let Some(v) = env_bool("ENABLE_CACHE")? {
            self.cache_enabled = v;
        }
        if let Some(v) = env_parse("FIELDS_CACHE_TTL")? {
            self.ttl_cache_seconds = v;
        }
        if let Some(v) = env_parse("SEARCH_CACHE_SIZE")? {
            self.lru_cache_capacity = v;
        }
        if let Some(level) = env_string("LOG_LEVEL") {
            self.log_level = level.to_lowercase();
        }
        if let Some(header) = env_string("REQUEST_ID_HEADER") {
            self.request_id_header = header;
        }
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        let parsed = url::Url::parse(&self.base_url).map_err(|e| {
            invalid("base_url", format!("base_url is not a valid URL: {}", e))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(invalid("base_url", "base_url must use http or https"));
        }

        positive("request_timeout_seconds", self.request_timeout_seconds)?;
        positive("connect_timeout_seconds", self.connect_timeout_seconds)?;
        positive(
            "circuit_recovery_timeout_seconds",
            self.circuit_recovery_timeout_seconds,
        )?;
        positive("ttl_cache_seconds", self.ttl_cache_seconds)?;
        if let Some(wait) = self.rate_limit_max_wait_seconds {
            positive("rate_limit_max_wait_seconds", wait)?;
        }
        if !self.retry_base_delay.is_finite() || self.retry_base_delay < 0.0 {
            return Err(invalid("retry_base_delay", "retry_base_delay must be >= 0"));
        }
        if !self.retry_max_delay.is_finite()
            || self.retry_max_delay < self.retry_base_delay
            || self.retry_max_delay > MAX_DURATION_SECONDS
        {
            return Err(invalid(
                "retry_max_delay",
                "retry_max_delay must be >= retry_base_delay",
            ));
        }

        let counts = [
            ("rate_limit_per_minute", self.rate_limit_per_minute),
            ("circuit_failure_threshold", self.circuit_failure_threshold),
            ("circuit_success_threshold", self.circuit_success_threshold),
            ("circuit_half_open_max_calls", self.circuit_half_open_max_calls),
            ("retry_max_attempts", self.retry_max_attempts),
        ];
        for (field, value) in counts {
            if value == 0 {
                return Err(invalid(field, format!("{} must be at least 1", field)));
            }
        }
        if self.rate_limit_burst == Some(0) {
            return Err(invalid("rate_limit_burst", "rate_limit_burst must be at least 1"));
        }
        if self.lru_cache_capacity == 0 || self.metadata_cache_max_entries == 0 {
            return Err(invalid("lru_cache_capacity", "cache sizes must be at least 1"));
        }
        if self.max_inflight == Some(0) {
            return Err(invalid("max_inflight", "max_inflight must be at least 1"));
        }
        if self.max_response_bytes == 0 {
            return Err(invalid("max_response_bytes", "max_response_bytes must be positive"));
        }
        if self.request_id_header.trim().is_empty() {
            return Err(invalid("request_id_header", "request_id_header cannot be empty"));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        secs(self.request_timeout_seconds)
    }

    pub fn connect_timeout(&self) -> Duration {
        secs(self.connect_timeout_seconds)
    }

    pub fn circuit_recovery_timeout(&self) -> Duration {
        secs(self.circuit_recovery_timeout_seconds)
    }

    pub fn ttl_cache_duration(&self) -> Duration {
        secs(self.ttl_cache_seconds)
    }

    pub fn retry_base_delay_duration(&self) -> Duration {
        secs(self.retry_base_delay)
    }

    pub fn retry_max_delay_duration(&self) -> Duration {
        secs(self.retry_max_delay)
    }

    pub fn rate_limit_max_wait(&self) -> Option<Duration> {
        self.rate_limit_max_wait_seconds.map(secs)
    }
}

fn secs(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(Duration::ZERO)
}

fn invalid(field: &str, msg: impl Into<String>) -> Error {
    Error::configuration_with_context(
        msg,
        ErrorContext::new()
            .with_field_path(format!("config.{}", field))
            .with_source("config_validator"),
    )
}

fn positive(field: &str, value: f64) -> Result<()> {
    if !(value.is_finite() && value > 0.0) {
        return Err(invalid(field, format!("{} must be a positive number", field)));
    }
    if value > MAX_DURATION_SECONDS {
        return Err(invalid(
            field,
            format!("{} must not exceed {} seconds", field, MAX_DURATION_SECONDS),
        ));
    }
    Ok(())
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parse<T: FromStr>(name: &str) -> Result<Option<T>> {
    match env_string(name) {
        None => Ok(None),
        Some(raw) => raw.parse::<T>().map(Some).map_err(|_| {
            Error::configuration_with_context(
                format!("cannot parse {}={:?}", name, raw),
                ErrorContext::new()
                    .with_field_path(format!("env.{}", name))
                    .with_source("config_env"),
            )
        }),
    }
}

fn env_bool(name: &str) -> Result<Option<bool>> {
    match env_string(name) {
        None => Ok(None),
        Some(raw) => match raw.to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(Some(true)),
            "0" | "false" | "no" | "off" => Ok(Some(false)),
            _ => Err(Error::configuration_with_context(
                format!("{} must be a boolean, got {:?}", name, raw),
                ErrorContext::new()
                    .with_field_path(format!("env.{}", name))
                    .with_source("config_env"),
            )),
        },
    }
}
