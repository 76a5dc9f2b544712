//! 传输层模块：对 USPTO 引用元数据接口的原始 HTTP 访问。
//!
//! # Transport Module
//!
//! The raw upstream seam. [`CitationApi`] is what the resilient facade calls;
//! [`HttpTransport`] is the production implementation over reqwest. Tests and
//! demos plug in their own implementations to script upstream behavior.
//!
//! | Endpoint | Method | Purpose |
//! |----------|--------|---------|
//! | `/enriched_cited_reference_metadata/v3/fields` | GET | Searchable field metadata |
//! | `/enriched_cited_reference_metadata/v3/records` | POST (form) | Lucene search over citations |

mod http;

pub use http::{HttpTransport, TransportError, FIELDS_PATH, RECORDS_PATH};

use crate::types::SearchRequest;
use crate::Result;
use async_trait::async_trait;
use serde_json::Value;

/// A single, unprotected exchange with the citation API.
#[async_trait]
pub trait CitationApi: Send + Sync {
    /// Metadata describing the searchable fields.
    async fn fetch_fields(&self, request_id: &str) -> Result<Value>;

    /// One page of citation records matching `request`.
    async fn search(&self, request: &SearchRequest, request_id: &str) -> Result<Value>;

    /// Short name used in logs.
    fn name(&self) -> &'static str;
}
