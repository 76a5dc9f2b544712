//! 类型模块：引用检索请求与响应的数据类型。
//!
//! # Types Module
//!
//! Request and response types shared by the transport, cache and facade layers.
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`SearchRequest`] | Lucene criteria with paging and field selection |
//! | [`ApiResponse`] | JSON body plus where it came from |
//! | [`ResponseSource`] | Upstream, fresh cache or stale cache |
//! | [`CacheStatus`] | `_cache_status` marker on degraded answers |
//!
//! ## Example
//!
//! ```rust
//! use enriched_citation_client::types::SearchRequest;
//!
//! let request = SearchRequest::new("techCenter:2800")
//!     .with_rows(25)
//!     .with_fields(["patentNumber", "citedDocumentIdentifier"]);
//! assert!(request.validate().is_ok());
//! ```

pub mod response;
pub mod search;

pub use response::{ApiResponse, CacheStatus, ResponseSource};
pub use search::{SearchRequest, DEFAULT_ROWS, MAX_ROWS_PER_REQUEST};
