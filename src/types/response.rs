//! Facade responses and the degraded-mode marker

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const STALE_CACHE_SOURCE: &str = "stale_cache";
pub const CIRCUIT_OPEN_MESSAGE: &str = "Service temporarily unavailable - using cached data";
pub const RETRY_EXHAUSTED_MESSAGE: &str = "Upstream request failed - using cached data";

/// Where a response body came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseSource {
    Upstream,
    /// Fresh hit served without contacting the upstream.
    Cache,
    /// Degraded answer served because the upstream is failing.
    StaleCache,
}

/// Annotation attached to degraded answers.
///
/// Serialized under the `_cache_status` key of the response object.
///
/// `circuit_breaker` is `"open"` only when the open circuit triggered the
/// fallback. When retries were exhausted it carries the breaker's state at
/// that moment (usually `"closed"`, since one exhausted call is a single
/// failure), and `"disabled"` when the client has no breaker. Consumers that
/// only need to know the answer is degraded should check `is_stale` or
/// `source` rather than this field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheStatus {
    pub source: String,
    pub is_stale: bool,
    pub age_seconds: f64,
    pub message: String,
    pub circuit_breaker: String,
}

impl CacheStatus {
    pub fn stale(age_seconds: f64, message: impl Into<String>, circuit_state: &str) -> Self {
        Self {
            source: STALE_CACHE_SOURCE.to_string(),
            is_stale: true,
            age_seconds: round_tenths(age_seconds),
            message: message.into(),
            circuit_breaker: circuit_state.to_string(),
        }
    }
}

fn round_tenths(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub data: Value,
    pub source: ResponseSource,
    pub cache_status: Option<CacheStatus>,
}

impl ApiResponse {
    pub fn upstream(data: Value) -> Self {
        Self {
            data,
            source: ResponseSource::Upstream,
            cache_status: None,
        }
    }

    pub fn cached(data: Value) -> Self {
        Self {
            data,
            source: ResponseSource::Cache,
            cache_status: None,
        }
    }

    pub fn degraded(data: Value, status: CacheStatus) -> Self {
        Self {
            data,
            source: ResponseSource::StaleCache,
            cache_status: Some(status),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.cache_status.is_some()
    }

    /// Documents of a records response (`response.docs`), empty for anything else.
    pub fn docs(&self) -> &[Value] {
        self.data
            .get("response")
            .and_then(|r| r.get("docs"))
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The body as JSON, with `_cache_status` merged in when degraded.
    ///
    /// Non-object bodies are wrapped as `{"data": ...}` so the marker has a
    /// place to live.
    pub fn into_json(self) -> Value {
        let Some(status) = self.cache_status else {
            return self.data;
        };
        let mut body = match self.data {
            Value::Object(map) => map,
            other => {
                let mut map = serde_json::Map::new();
                map.insert("data".to_string(), other);
                map
            }
        };
        body.insert(
            "_cache_status".to_string(),
            serde_json::to_value(status).unwrap_or(Value::Null),
        );
        Value::Object(body)
    }
}
