use crate::config::ClientConfig;
use crate::error::{Error, ErrorContext};
use crate::transport::CitationApi;
use crate::types::SearchRequest;
use crate::Result;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, CONTENT_LENGTH, CONTENT_TYPE, RETRY_AFTER};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

pub const FIELDS_PATH: &str = "/enriched_cited_reference_metadata/v3/fields";
pub const RECORDS_PATH: &str = "/enriched_cited_reference_metadata/v3/records";

const ACCEPTED_CONTENT_TYPES: [&str; 3] =
    ["application/json", "application/gzip", "application/x-gzip"];

/// reqwest-backed access to the enriched citation endpoints.
///
/// One call is one HTTP exchange: no retries, no caching. Every outcome is
/// mapped onto [`Error`] so the resilience layers can classify it.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    request_id_header: String,
    request_timeout: Duration,
    max_response_bytes: u64,
    response_warn_bytes: u64,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .connect_timeout(config.connect_timeout())
            .pool_max_idle_per_host(5)
            .pool_idle_timeout(Some(Duration::from_secs(90)))
            .gzip(true)
            .build()
            .map_err(|e| Error::Transport(TransportError::Other(e.to_string())))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            request_id_header: config.request_id_header.clone(),
            request_timeout: config.request_timeout(),
            max_response_bytes: config.max_response_bytes,
            response_warn_bytes: config.response_warn_bytes,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn prepare(&self, req: reqwest::RequestBuilder, request_id: &str) -> reqwest::RequestBuilder {
        let mut req = req
            .header("accept", "application/json")
            .header(self.request_id_header.as_str(), request_id);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        req
    }

    async fn send(&self, req: reqwest::RequestBuilder, request_id: &str) -> Result<Value> {
        let response = req
            .send()
            .await
            .map_err(|e| self.map_send_error(e).with_request_id(request_id))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after_ms = retry_after_ms(response.headers());
            let body = response.text().await.unwrap_or_default();
            let message = extract_error_message(&body, status.as_u16());
            debug!(
                request_id,
                status = status.as_u16(),
                "upstream returned error status"
            );
            return Err(
                Error::remote(status.as_u16(), message, retry_after_ms).with_request_id(request_id)
            );
        }

        validate_content_type(response.headers())
            .map_err(|e| e.with_request_id(request_id))?;
        self.check_declared_size(response.headers())
            .map_err(|e| e.with_request_id(request_id))?;

        let bytes = self
            .read_limited(response)
            .await
            .map_err(|e| e.with_request_id(request_id))?;

        serde_json::from_slice::<Value>(&bytes).map_err(|e| {
            Error::invalid_response_with_context(
                format!("response body is not valid JSON: {}", e),
                ErrorContext::new()
                    .with_source("http_transport")
                    .with_request_id(request_id),
            )
        })
    }

    fn map_send_error(&self, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::Timeout {
                timeout: self.request_timeout,
                context: ErrorContext::new().with_source("http_transport"),
            }
        } else if e.is_connect() {
            Error::Transport(TransportError::Connect(e.to_string()))
        } else {
            Error::Transport(TransportError::Http(e))
        }
    }

    fn check_declared_size(&self, headers: &HeaderMap) -> Result<()> {
        let Some(raw) = headers.get(CONTENT_LENGTH) else {
            return Ok(());
        };
        let Some(length) = raw.to_str().ok().and_then(|s| s.trim().parse::<u64>().ok()) else {
            warn!(header = ?raw, "invalid Content-Length header");
            return Ok(());
        };
        if length > self.max_response_bytes {
            return Err(self.too_large(length));
        }
        if length > self.response_warn_bytes {
            warn!(
                bytes = length,
                "large response received; consider narrower criteria or pagination"
            );
        }
        Ok(())
    }

    // Content-Length may be absent or wrong, so the body is bounded while reading.
    async fn read_limited(&self, mut response: reqwest::Response) -> Result<Vec<u8>> {
        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| self.map_send_error(e))? {
            body.extend_from_slice(&chunk);
            if body.len() as u64 > self.max_response_bytes {
                return Err(self.too_large(body.len() as u64));
            }
        }
        Ok(body)
    }

    fn too_large(&self, bytes: u64) -> Error {
        Error::invalid_response_with_context(
            format!(
                "Response too large: {:.2} MB exceeds maximum of {:.0} MB",
                bytes as f64 / (1024.0 * 1024.0),
                self.max_response_bytes as f64 / (1024.0 * 1024.0)
            ),
            ErrorContext::new()
                .with_source("http_transport")
                .with_details(format!("{} bytes", bytes)),
        )
    }
}

#[async_trait]
impl CitationApi for HttpTransport {
    async fn fetch_fields(&self, request_id: &str) -> Result<Value> {
        let req = self.prepare(self.client.get(self.url(FIELDS_PATH)), request_id);
        self.send(req, request_id).await
    }

    async fn search(&self, request: &SearchRequest, request_id: &str) -> Result<Value> {
        let req = self.prepare(
            self.client
                .post(self.url(RECORDS_PATH))
                .form(&request.form_params()),
            request_id,
        );
        let body = self.send(req, request_id).await?;
        if let Some(api_error) = body.get("error") {
            let message = match api_error {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            return Err(Error::invalid_response_with_context(
                format!("API error: {}", message),
                ErrorContext::new()
                    .with_source("http_transport")
                    .with_request_id(request_id),
            ));
        }
        Ok(body)
    }

    fn name(&self) -> &'static str {
        "uspto_enriched_citation"
    }
}

fn validate_content_type(headers: &HeaderMap) -> Result<()> {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_lowercase())
        .unwrap_or_default();
    if content_type.is_empty() {
        return Err(Error::invalid_response_with_context(
            "Response missing Content-Type header",
            ErrorContext::new().with_source("http_transport"),
        ));
    }
    if ACCEPTED_CONTENT_TYPES
        .iter()
        .any(|accepted| content_type.starts_with(accepted))
    {
        Ok(())
    } else {
        Err(Error::invalid_response_with_context(
            format!("Unexpected Content-Type: {}", content_type),
            ErrorContext::new()
                .with_source("http_transport")
                .with_details(format!("expected one of {:?}", ACCEPTED_CONTENT_TYPES)),
        ))
    }
}

/// `Retry-After` in delay-seconds form; HTTP-date values are ignored.
fn retry_after_ms(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(|secs| secs.saturating_mul(1000))
}

fn extract_error_message(body: &str, status: u16) -> String {
    if let Ok(json) = serde_json::from_str::<Value>(body) {
        for key in ["error", "message"] {
            match json.get(key) {
                Some(Value::String(s)) if !s.is_empty() => return s.clone(),
                Some(Value::Object(obj)) => {
                    if let Some(Value::String(s)) = obj.get("message") {
                        return s.clone();
                    }
                }
                _ => {}
            }
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("HTTP {}", status)
    } else {
        trimmed.chars().take(500).collect()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Transport error: {0}")]
    Other(String),
}
