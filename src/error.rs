use crate::error_code::StandardErrorCode;
use crate::transport::TransportError;
use std::time::Duration;
use thiserror::Error;

/// Structured error context for better error handling and debugging.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ErrorContext {
    /// Field path or configuration key that caused the error (e.g., "search.rows", "config.base_url")
    pub field_path: Option<String>,
    /// Additional context about the error (e.g., expected type, actual value)
    pub details: Option<String>,
    /// Source of the error (e.g., "http_transport", "config_validator")
    pub source: Option<String>,
    /// Client-generated request id of the call that failed
    pub request_id: Option<String>,
    /// Upstream HTTP status, when one was received
    pub status_code: Option<u16>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field_path(mut self, path: impl Into<String>) -> Self {
        self.field_path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = Some(id.into());
        self
    }

    pub fn with_status_code(mut self, status: u16) -> Self {
        self.status_code = Some(status);
        self
    }
}

/// Unified error type for the citation client.
///
/// Transport and upstream failures keep their identity through every
/// resilience layer; the layers add their own variants (`CircuitOpen`,
/// `RetryExhausted`, `RateLimitTimeout`) instead of rewriting the cause.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Circuit breaker open for {resource} (retry in {}ms)", .retry_in.as_millis())]
    CircuitOpen { resource: String, retry_in: Duration },

    #[error("Retries exhausted after {attempts} attempts: {last}")]
    RetryExhausted {
        attempts: u32,
        #[source]
        last: Box<Error>,
    },

    #[error("Rate limit wait for {resource} exceeded {}ms", .waited.as_millis())]
    RateLimitTimeout { resource: String, waited: Duration },

    #[error("Request timed out after {}ms{}", .timeout.as_millis(), format_context(.context))]
    Timeout {
        timeout: Duration,
        context: ErrorContext,
    },

    #[error("Network transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Remote error: HTTP {status} ({}): {message}", .code.name())]
    Remote {
        status: u16,
        code: StandardErrorCode,
        message: String,
        retry_after_ms: Option<u64>,
        context: ErrorContext,
    },

    #[error("Invalid upstream response: {message}{}", format_context(.context))]
    InvalidResponse {
        message: String,
        context: ErrorContext,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {message}{}", format_context(.context))]
    Validation {
        message: String,
        context: ErrorContext,
    },

    #[error("Configuration error: {message}{}", format_context(.context))]
    Configuration {
        message: String,
        context: ErrorContext,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// Helper function to format error context for display
fn format_context(ctx: &ErrorContext) -> String {
    let mut parts = Vec::new();
    if let Some(ref field) = ctx.field_path {
        parts.push(format!("field: {}", field));
    }
    if let Some(ref details) = ctx.details {
        parts.push(format!("details: {}", details));
    }
    if let Some(ref source) = ctx.source {
        parts.push(format!("source: {}", source));
    }
    if let Some(ref id) = ctx.request_id {
        parts.push(format!("request_id: {}", id));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

impl Error {
    pub fn validation_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Validation {
            message: msg.into(),
            context,
        }
    }

    pub fn configuration_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Configuration {
            message: msg.into(),
            context,
        }
    }

    pub fn invalid_response_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::InvalidResponse {
            message: msg.into(),
            context,
        }
    }

    /// Build a remote error from an upstream status and body.
    pub fn remote(status: u16, message: impl Into<String>, retry_after_ms: Option<u64>) -> Self {
        Error::Remote {
            status,
            code: StandardErrorCode::from_http_status(status),
            message: message.into(),
            retry_after_ms,
            context: ErrorContext::new().with_status_code(status),
        }
    }

    pub fn timeout(timeout: Duration) -> Self {
        Error::Timeout {
            timeout,
            context: ErrorContext::new(),
        }
    }

    /// Stable classification of this error.
    pub fn standard_code(&self) -> StandardErrorCode {
        match self {
            Error::CircuitOpen { .. } => StandardErrorCode::CircuitOpen,
            Error::RetryExhausted { .. } => StandardErrorCode::RetryExhausted,
            Error::RateLimitTimeout { .. } => StandardErrorCode::RateLimitTimeout,
            Error::Timeout { .. } => StandardErrorCode::Timeout,
            Error::Transport(_) => StandardErrorCode::Unavailable,
            Error::Remote { code, .. } => *code,
            Error::InvalidResponse { .. } => StandardErrorCode::InvalidResponse,
            Error::NotFound(_) => StandardErrorCode::NotFound,
            Error::Validation { .. } => StandardErrorCode::InvalidRequest,
            Error::Configuration { .. }
            | Error::Serialization(_)
            | Error::Yaml(_)
            | Error::Io(_) => StandardErrorCode::Unknown,
        }
    }

    /// Whether the retry policy may attempt the failed call again.
    ///
    /// Connection failures, timeouts, 5xx and 429 responses are transient.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Timeout { .. } | Error::Transport(_) => true,
            Error::Remote { code, .. } => code.retryable(),
            _ => false,
        }
    }

    /// Whether the circuit breaker counts this outcome as an upstream failure.
    ///
    /// Locally raised errors (validation, configuration, an open circuit, a
    /// rate-limit wait timeout) say nothing about upstream health.
    pub fn counts_as_failure(&self) -> bool {
        match self {
            Error::Timeout { .. }
            | Error::Transport(_)
            | Error::Remote { .. }
            | Error::InvalidResponse { .. }
            | Error::RetryExhausted { .. } => self.standard_code().breaker_countable(),
            _ => false,
        }
    }

    /// Whether the facade may answer this failure from stale cache.
    pub fn is_degradable(&self) -> bool {
        matches!(self, Error::CircuitOpen { .. } | Error::RetryExhausted { .. })
    }

    pub fn is_circuit_open(&self) -> bool {
        matches!(self, Error::CircuitOpen { .. })
    }

    /// The innermost cause, looking through retry exhaustion.
    pub fn root_cause(&self) -> &Error {
        match self {
            Error::RetryExhausted { last, .. } => last.root_cause(),
            other => other,
        }
    }

    /// A safe, user-facing message for this error.
    pub fn user_message(&self) -> String {
        match self {
            Error::Validation { message, .. } => {
                crate::utils::sanitize::sanitize_error_message(message)
            }
            Error::NotFound(what) => crate::utils::sanitize::sanitize_error_message(&format!(
                "Not found: {}",
                what
            )),
            other => other.standard_code().user_message().to_string(),
        }
    }

    /// Extract error context if available
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::Timeout { context, .. }
            | Error::Remote { context, .. }
            | Error::InvalidResponse { context, .. }
            | Error::Validation { context, .. }
            | Error::Configuration { context, .. } => Some(context),
            _ => None,
        }
    }

    /// Attach the request id of the call that produced this error.
    pub fn with_request_id(mut self, id: &str) -> Self {
        match &mut self {
            Error::Timeout { context, .. }
            | Error::Remote { context, .. }
            | Error::InvalidResponse { context, .. } => {
                context.request_id = Some(id.to_string());
            }
            _ => {}
        }
        self
    }
}
