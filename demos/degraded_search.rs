//! Degraded Search Example
//!
//! Walks a client through an upstream outage without touching the network:
//! 1. Warm the caches while the upstream is healthy
//! 2. Take the upstream down and watch retries exhaust and the circuit open
//! 3. Keep answering from stale cache, marked with `_cache_status`
//!
//! Run with: cargo run --example degraded_search

use async_trait::async_trait;
use enriched_citation_client::{
    telemetry, CitationApi, ClientConfig, Error, ResilientClient, Result, SearchRequest,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Stand-in for the USPTO API that can be switched off.
struct FlakyUpstream {
    up: AtomicBool,
}

#[async_trait]
impl CitationApi for FlakyUpstream {
    async fn fetch_fields(&self, _request_id: &str) -> Result<Value> {
        if !self.up.load(Ordering::SeqCst) {
            return Err(Error::remote(503, "Service Unavailable", None));
        }
        Ok(json!({
            "fieldCount": 3,
            "fields": ["patentApplicationNumber", "citedDocumentIdentifier", "techCenter"]
        }))
    }

    async fn search(&self, request: &SearchRequest, _request_id: &str) -> Result<Value> {
        if !self.up.load(Ordering::SeqCst) {
            return Err(Error::remote(503, "Service Unavailable", None));
        }
        Ok(json!({
            "response": {
                "numFound": 1,
                "start": request.start,
                "docs": [{"id": "c0ffee", "techCenter": "2800", "criteria": request.criteria}]
            }
        }))
    }

    fn name(&self) -> &'static str {
        "flaky_demo"
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init_logging("enriched_citation_client=info");

    let upstream = Arc::new(FlakyUpstream {
        up: AtomicBool::new(true),
    });
    let config = ClientConfig {
        retry_base_delay: 0.05,
        retry_max_delay: 0.2,
        ..ClientConfig::default()
    };
    let client = ResilientClient::builder(config)
        .upstream(upstream.clone())
        .build()?;

    let request = SearchRequest::new("techCenter:2800").with_rows(5);

    println!("== healthy upstream ==");
    let fields = client.get_fields().await?;
    println!("fields: {:?}", fields.source);
    let page = client.search_records(&request).await?;
    println!("search: {:?}, {} docs", page.source, page.docs().len());

    println!("\n== upstream down ==");
    upstream.up.store(false, Ordering::SeqCst);
    for i in 0..3 {
        let fresh = SearchRequest::new(format!("techCenter:{}", 1600 + i * 100));
        match client.search_records(&fresh).await {
            Ok(resp) => println!("unexpected answer: {:?}", resp.source),
            Err(e) => println!("uncached query {} failed: {}", i + 1, e.user_message()),
        }
    }
    if let Some(breaker) = client.circuit_breaker() {
        println!("circuit: {}", breaker.state());
    }

    println!("\n== degraded answers ==");
    let degraded = client.search_records(&request).await?;
    println!("{}", serde_json::to_string_pretty(&degraded.into_json())?);

    let signals = client.signals();
    println!(
        "\nsignals: {}",
        serde_json::to_string_pretty(&signals)?
    );
    Ok(())
}
