//! Standard error codes for upstream and resilience failures.
//!
//! Every failure the client can surface maps onto one stable code. The code
//! carries the two decisions the resilience layer needs: whether the retry
//! policy may try again, and whether the circuit breaker should count the
//! outcome as a failure of the upstream dependency.
//!
//! ## Error Code Categories
//!
//! | Prefix | Category   | Description                               |
//! |--------|------------|-------------------------------------------|
//! | E1xxx  | client     | Request rejected by the upstream          |
//! | E2xxx  | rate       | Upstream rate limiting                    |
//! | E3xxx  | server     | Upstream unavailable or misbehaving       |
//! | E4xxx  | resilience | Raised locally by breaker/retry/limiter   |
//! | E9xxx  | unknown    | Catch-all / unclassified                  |
//!
//! ## Example
//!
//! ```rust
//! use enriched_citation_client::error_code::StandardErrorCode;
//!
//! let code = StandardErrorCode::from_http_status(503);
//! assert_eq!(code.code(), "E3002");
//! assert!(code.retryable());
//! assert_eq!(code.category(), "server");
//! ```

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StandardErrorCode {
    /// E1001: Malformed request or invalid parameters
    InvalidRequest,
    /// E1002: Missing or invalid API key
    Authentication,
    /// E1003: Valid credentials but insufficient permissions
    PermissionDenied,
    /// E1004: Requested record or endpoint does not exist
    NotFound,
    /// E1005: Payload exceeds what the upstream accepts
    RequestTooLarge,
    /// E2001: Upstream rate limit exceeded (HTTP 429)
    RateLimited,
    /// E3001: Internal server error on the upstream
    ServerError,
    /// E3002: Upstream gateway or service unavailable
    Unavailable,
    /// E3003: No response before the request timeout
    Timeout,
    /// E3004: Response failed content-type, size or body checks
    InvalidResponse,
    /// E4001: Circuit breaker rejected the call without attempting it
    CircuitOpen,
    /// E4002: Retry policy ran out of attempts
    RetryExhausted,
    /// E4003: Bounded rate-limit wait was exceeded
    RateLimitTimeout,
    /// E9999: Error could not be classified
    Unknown,
}

impl StandardErrorCode {
    #[inline]
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidRequest => "E1001",
            Self::Authentication => "E1002",
            Self::PermissionDenied => "E1003",
            Self::NotFound => "E1004",
            Self::RequestTooLarge => "E1005",
            Self::RateLimited => "E2001",
            Self::ServerError => "E3001",
            Self::Unavailable => "E3002",
            Self::Timeout => "E3003",
            Self::InvalidResponse => "E3004",
            Self::CircuitOpen => "E4001",
            Self::RetryExhausted => "E4002",
            Self::RateLimitTimeout => "E4003",
            Self::Unknown => "E9999",
        }
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            Self::InvalidRequest => "invalid_request",
            Self::Authentication => "authentication",
            Self::PermissionDenied => "permission_denied",
            Self::NotFound => "not_found",
            Self::RequestTooLarge => "request_too_large",
            Self::RateLimited => "rate_limited",
            Self::ServerError => "server_error",
            Self::Unavailable => "unavailable",
            Self::Timeout => "timeout",
            Self::InvalidResponse => "invalid_response",
            Self::CircuitOpen => "circuit_open",
            Self::RetryExhausted => "retry_exhausted",
            Self::RateLimitTimeout => "rate_limit_timeout",
            Self::Unknown => "unknown",
        }
    }

    /// Whether the retry policy may attempt the call again.
    #[inline]
    pub fn retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited | Self::ServerError | Self::Unavailable | Self::Timeout
        )
    }

    /// Whether a failure with this code counts against the circuit breaker.
    ///
    /// Upstream rejections count even when they are not retryable (the call
    /// did fail). Codes raised by the resilience layer itself never count.
    #[inline]
    pub fn breaker_countable(&self) -> bool {
        !matches!(
            self,
            Self::CircuitOpen | Self::RateLimitTimeout | Self::Unknown
        )
    }

    /// Returns `"client"`, `"rate"`, `"server"`, `"resilience"`, or `"unknown"`.
    #[inline]
    pub fn category(&self) -> &'static str {
        match self {
            Self::InvalidRequest
            | Self::Authentication
            | Self::PermissionDenied
            | Self::NotFound
            | Self::RequestTooLarge => "client",
            Self::RateLimited => "rate",
            Self::ServerError | Self::Unavailable | Self::Timeout | Self::InvalidResponse => {
                "server"
            }
            Self::CircuitOpen | Self::RetryExhausted | Self::RateLimitTimeout => "resilience",
            Self::Unknown => "unknown",
        }
    }

    /// Maps an HTTP status code to the most likely code.
    pub fn from_http_status(status: u16) -> Self {
        match status {
            400 | 422 => Self::InvalidRequest,
            401 => Self::Authentication,
            403 => Self::PermissionDenied,
            404 => Self::NotFound,
            408 | 504 => Self::Timeout,
            413 => Self::RequestTooLarge,
            429 => Self::RateLimited,
            500 => Self::ServerError,
            502 | 503 => Self::Unavailable,
            s if (500..600).contains(&s) => Self::ServerError,
            s if (400..500).contains(&s) => Self::InvalidRequest,
            _ => Self::Unknown,
        }
    }

    /// Friendly text for end users; never includes upstream details.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::InvalidRequest => "Invalid request parameters. Please check your query syntax.",
            Self::Authentication => "Authentication failed. Please check your API key.",
            Self::PermissionDenied => {
                "Access forbidden. You do not have permission for this operation."
            }
            Self::NotFound => "Requested resource not found.",
            Self::RequestTooLarge => "Request too large. Reduce the query or the number of rows.",
            Self::RateLimited => "Rate limit exceeded. Please try again later.",
            Self::ServerError => "Citation API error occurred. Please try again.",
            Self::Unavailable => "Citation API is temporarily unavailable.",
            Self::Timeout => "Request timed out. The citation API may be experiencing delays.",
            Self::InvalidResponse => "Invalid response from the citation API.",
            Self::CircuitOpen => "Service temporarily unavailable. Please try again later.",
            Self::RetryExhausted => {
                "The citation API did not respond successfully after several attempts."
            }
            Self::RateLimitTimeout => "Too many requests queued. Please try again later.",
            Self::Unknown => "An unexpected error occurred.",
        }
    }
}

impl fmt::Display for StandardErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.code(), self.name())
    }
}
