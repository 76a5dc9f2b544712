//! Redaction of sensitive fragments in error text.
//!
//! Messages shown to users may echo upstream bodies or local errors. Before
//! that happens, file paths, URLs, key-like tokens, IP addresses and
//! password assignments are replaced with fixed placeholders.

use once_cell::sync::Lazy;
use regex::Regex;

// URLs go first so their paths are not half-redacted as file paths.
static SENSITIVE_PATTERNS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (r"(?i)https?://[^\s]+", "[URL_REDACTED]"),
        (r#"(?i)password["']?\s*[:=]\s*["']?[^\s"']+"#, "password=[REDACTED]"),
        (r"[A-Za-z]:\\[^:\s]+", "[PATH_REDACTED]"),
        (r"/[^\s:]+/[^\s:]+", "[PATH_REDACTED]"),
        (r"\b\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}\b", "[IP_REDACTED]"),
        (r"(?i)\b[a-z0-9]{28,40}\b", "[KEY_REDACTED]"),
    ]
    .into_iter()
    .filter_map(|(pattern, replacement)| Regex::new(pattern).ok().map(|re| (re, replacement)))
    .collect()
});

pub fn sanitize_error_message(message: &str) -> String {
    SENSITIVE_PATTERNS
        .iter()
        .fold(message.to_string(), |acc, (re, replacement)| {
            re.replace_all(&acc, *replacement).into_owned()
        })
}
