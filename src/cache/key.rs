//! Cache key generation.
//!
//! Keys are SHA-256 digests over a canonical JSON rendering of the request
//! parameters, so equivalent requests collide and nothing user-controlled
//! ends up verbatim in a key.

use crate::types::SearchRequest;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub namespace: String,
    pub hash: String,
}

impl CacheKey {
    pub fn new(namespace: impl Into<String>, hash: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            hash: hash.into(),
        }
    }

    /// `namespace:hash`, the string the tiers are keyed by.
    pub fn as_string(&self) -> String {
        format!("{}:{}", self.namespace, self.hash)
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.namespace, self.hash)
    }
}

pub struct CacheKeyGenerator {
    salt: Option<String>,
}

impl CacheKeyGenerator {
    pub fn new() -> Self {
        Self { salt: None }
    }

    /// Mix `salt` (usually the upstream base URL) into every key.
    pub fn with_salt(mut self, salt: impl Into<String>) -> Self {
        self.salt = Some(salt.into());
        self
    }

    fn digest(&self, mut parts: BTreeMap<&'static str, serde_json::Value>) -> String {
        if let Some(ref s) = self.salt {
            parts.insert("salt", serde_json::Value::String(s.clone()));
        }
        let canonical = serde_json::to_string(&parts).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        hasher
            .finalize()
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect()
    }

    pub fn fields(&self) -> CacheKey {
        let mut parts = BTreeMap::new();
        parts.insert("endpoint", serde_json::json!("fields"));
        CacheKey::new("fields", self.digest(parts))
    }

    /// Criteria, paging and the normalized field list; field order and
    /// duplicates do not matter.
    pub fn search(&self, request: &SearchRequest) -> CacheKey {
        let mut parts = BTreeMap::new();
        parts.insert("endpoint", serde_json::json!("records"));
        parts.insert("criteria", serde_json::json!(request.criteria.trim()));
        parts.insert("start", serde_json::json!(request.start));
        parts.insert("rows", serde_json::json!(request.rows));
        parts.insert("fields", serde_json::json!(request.normalized_fields()));
        CacheKey::new("search", self.digest(parts))
    }
}

impl Default for CacheKeyGenerator {
    fn default() -> Self {
        Self::new()
    }
}
