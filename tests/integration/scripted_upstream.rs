//! In-process upstream whose health can be flipped mid-test.

use async_trait::async_trait;
use enriched_citation_client::{
    CitationApi, ClientConfig, Error, ResilientClient, Result, SearchRequest,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    Healthy,
    /// Every call fails with this HTTP status.
    Failing(u16),
    /// Calls never complete; only the request timeout ends them.
    Hanging,
}

pub struct ScriptedUpstream {
    behavior: Mutex<Behavior>,
    fields_calls: AtomicUsize,
    search_calls: AtomicUsize,
}

impl ScriptedUpstream {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            behavior: Mutex::new(Behavior::Healthy),
            fields_calls: AtomicUsize::new(0),
            search_calls: AtomicUsize::new(0),
        })
    }

    pub fn set(&self, behavior: Behavior) {
        *self.behavior.lock().unwrap() = behavior;
    }

    pub fn fields_calls(&self) -> usize {
        self.fields_calls.load(Ordering::SeqCst)
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.fields_calls() + self.search_calls()
    }

    fn current(&self) -> Behavior {
        *self.behavior.lock().unwrap()
    }

    async fn respond(&self, body: Value) -> Result<Value> {
        match self.current() {
            Behavior::Healthy => Ok(body),
            Behavior::Failing(status) => Err(Error::remote(status, "upstream failure", None)),
            Behavior::Hanging => std::future::pending().await,
        }
    }
}

pub fn fields_body() -> Value {
    json!({
        "apiKey": "enriched_cited_reference_metadata",
        "apiVersionNumber": "v3",
        "fieldCount": 3,
        "fields": ["patentApplicationNumber", "citedDocumentIdentifier", "techCenter"]
    })
}

/// One doc per request, named after the criteria. Criteria mentioning
/// `missing` match nothing.
pub fn records_body(request: &SearchRequest) -> Value {
    let docs = if request.criteria.contains("missing") {
        vec![]
    } else {
        vec![json!({
            "id": format!("doc-{}", request.criteria),
            "techCenter": "2800",
        })]
    };
    json!({
        "response": {
            "numFound": docs.len(),
            "start": request.start,
            "docs": docs,
        }
    })
}

#[async_trait]
impl CitationApi for ScriptedUpstream {
    async fn fetch_fields(&self, _request_id: &str) -> Result<Value> {
        self.fields_calls.fetch_add(1, Ordering::SeqCst);
        self.respond(fields_body()).await
    }

    async fn search(&self, request: &SearchRequest, _request_id: &str) -> Result<Value> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        self.respond(records_body(request)).await
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Test defaults with a single attempt per call, so each facade call is one
/// breaker outcome.
pub fn single_attempt_config() -> ClientConfig {
    ClientConfig {
        retry_max_attempts: 1,
        ..ClientConfig::for_tests()
    }
}

pub fn client_with(config: ClientConfig, upstream: &Arc<ScriptedUpstream>) -> ResilientClient {
    ResilientClient::builder(config)
        .upstream(upstream.clone())
        .build()
        .expect("client should build")
}
