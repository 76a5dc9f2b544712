//! Circuit breaking, retries and stale cache fallback through the facade.

use crate::integration::scripted_upstream::{
    client_with, single_attempt_config, Behavior, ScriptedUpstream,
};
use enriched_citation_client::resilience::CircuitState;
use enriched_citation_client::types::response::{CIRCUIT_OPEN_MESSAGE, RETRY_EXHAUSTED_MESSAGE};
use enriched_citation_client::{ClientConfig, Error, ResponseSource, SearchRequest};
use std::time::Duration;
use tokio::time::Instant;

fn search(criteria: &str) -> SearchRequest {
    SearchRequest::new(criteria).with_rows(10)
}

#[tokio::test(start_paused = true)]
async fn test_circuit_opens_after_three_failures() {
    let upstream = ScriptedUpstream::new();
    upstream.set(Behavior::Failing(503));
    let client = client_with(single_attempt_config(), &upstream);

    for i in 0..3 {
        let err = client
            .search_records(&search(&format!("techCenter:{}", i)))
            .await
            .unwrap_err();
        // Nothing cached yet, so the original failure surfaces.
        assert!(matches!(err, Error::RetryExhausted { .. }), "{err}");
    }

    let breaker = client.circuit_breaker().unwrap();
    assert_eq!(breaker.state(), CircuitState::Open);
    assert_eq!(upstream.search_calls(), 3);

    let err = client
        .search_records(&search("techCenter:9"))
        .await
        .unwrap_err();
    assert!(err.is_circuit_open());
    assert_eq!(upstream.search_calls(), 3, "open circuit must not call upstream");
    assert_eq!(breaker.snapshot().total_rejections, 1);
}

#[tokio::test(start_paused = true)]
async fn test_recovery_window_and_half_open_probe() {
    let upstream = ScriptedUpstream::new();
    upstream.set(Behavior::Failing(503));
    let client = client_with(single_attempt_config(), &upstream);

    for i in 0..3 {
        let _ = client.search_records(&search(&format!("q{}", i))).await;
    }
    let breaker = client.circuit_breaker().unwrap();
    assert_eq!(breaker.state(), CircuitState::Open);

    tokio::time::advance(Duration::from_secs(29)).await;
    let err = client.search_records(&search("q-29")).await.unwrap_err();
    assert!(err.is_circuit_open());
    assert_eq!(upstream.search_calls(), 3);

    tokio::time::advance(Duration::from_secs(2)).await;
    upstream.set(Behavior::Healthy);
    let probe = client.search_records(&search("q-31")).await.unwrap();
    assert_eq!(probe.source, ResponseSource::Upstream);
    assert_eq!(upstream.search_calls(), 4);
    assert_eq!(breaker.state(), CircuitState::HalfOpen);

    client.search_records(&search("q-32")).await.unwrap();
    assert_eq!(breaker.state(), CircuitState::Closed);
}

#[tokio::test(start_paused = true)]
async fn test_half_open_failure_reopens() {
    let upstream = ScriptedUpstream::new();
    upstream.set(Behavior::Failing(503));
    let client = client_with(single_attempt_config(), &upstream);

    for i in 0..3 {
        let _ = client.search_records(&search(&format!("q{}", i))).await;
    }
    tokio::time::advance(Duration::from_secs(31)).await;

    let err = client.search_records(&search("probe")).await.unwrap_err();
    assert!(matches!(err, Error::RetryExhausted { .. }));
    let breaker = client.circuit_breaker().unwrap();
    assert_eq!(breaker.state(), CircuitState::Open);

    let snap = breaker.snapshot();
    assert_eq!(snap.open_remaining_ms, Some(30_000));
}

#[tokio::test(start_paused = true)]
async fn test_stale_fields_served_while_open() {
    let upstream = ScriptedUpstream::new();
    let client = client_with(single_attempt_config(), &upstream);

    let first = client.get_fields().await.unwrap();
    assert_eq!(first.source, ResponseSource::Upstream);

    tokio::time::advance(Duration::from_secs(12)).await;
    upstream.set(Behavior::Failing(503));
    client.circuit_breaker().unwrap().force_open();

    let degraded = client.get_fields().await.unwrap();
    assert_eq!(degraded.source, ResponseSource::StaleCache);
    assert_eq!(degraded.data, first.data);
    assert_eq!(upstream.fields_calls(), 1);

    let status = degraded.cache_status.clone().unwrap();
    assert_eq!(status.source, "stale_cache");
    assert!(status.is_stale);
    assert_eq!(status.message, CIRCUIT_OPEN_MESSAGE);
    assert_eq!(status.circuit_breaker, "open");
    assert!((status.age_seconds - 12.0).abs() < 0.2);

    let body = degraded.into_json();
    assert_eq!(body["_cache_status"]["circuit_breaker"], "open");
    assert_eq!(body["fieldCount"], 3);
}

#[tokio::test(start_paused = true)]
async fn test_fresh_fields_bypass_upstream_while_closed() {
    let upstream = ScriptedUpstream::new();
    let client = client_with(single_attempt_config(), &upstream);

    client.get_fields().await.unwrap();
    upstream.set(Behavior::Failing(503));

    let cached = client.get_fields().await.unwrap();
    assert_eq!(cached.source, ResponseSource::Cache);
    assert!(!cached.is_degraded());
    assert_eq!(upstream.fields_calls(), 1);
    assert_eq!(client.cache_stats().metadata.hits, 1);
}

#[tokio::test(start_paused = true)]
async fn test_expired_fields_served_after_retries_exhausted() {
    let upstream = ScriptedUpstream::new();
    let config = ClientConfig {
        ttl_cache_seconds: 60.0,
        ..ClientConfig::for_tests()
    };
    let client = client_with(config, &upstream);

    client.get_fields().await.unwrap();
    tokio::time::advance(Duration::from_secs(120)).await;
    upstream.set(Behavior::Failing(502));

    let degraded = client.get_fields().await.unwrap();
    assert_eq!(upstream.fields_calls(), 4, "one fill plus three attempts");

    let status = degraded.cache_status.unwrap();
    assert_eq!(status.message, RETRY_EXHAUSTED_MESSAGE);
    // One exhausted call is a single breaker failure.
    assert_eq!(status.circuit_breaker, "closed");
    assert!(status.age_seconds >= 120.0);
    assert_eq!(client.cache_stats().metadata.stale_hits, 1);
}

#[tokio::test(start_paused = true)]
async fn test_search_falls_back_to_lru_entry() {
    let upstream = ScriptedUpstream::new();
    let client = client_with(single_attempt_config(), &upstream);

    let request = search("techCenter:2800");
    let fresh = client.search_records(&request).await.unwrap();
    assert_eq!(fresh.docs().len(), 1);

    upstream.set(Behavior::Failing(503));
    client.circuit_breaker().unwrap().force_open();

    let degraded = client.search_records(&request).await.unwrap();
    assert!(degraded.is_degraded());
    assert_eq!(degraded.docs(), fresh.docs());

    let err = client
        .search_records(&search("techCenter:1600"))
        .await
        .unwrap_err();
    assert!(err.is_circuit_open(), "uncached query has nothing to fall back on");
}

#[tokio::test(start_paused = true)]
async fn test_no_cache_surfaces_original_error() {
    let upstream = ScriptedUpstream::new();
    let config = ClientConfig {
        cache_enabled: false,
        ..ClientConfig::for_tests()
    };
    let client = client_with(config, &upstream);

    client.get_fields().await.unwrap();
    client.get_fields().await.unwrap();
    assert_eq!(upstream.fields_calls(), 2, "disabled cache never answers");

    upstream.set(Behavior::Failing(503));
    let err = client.get_fields().await.unwrap_err();
    match &err {
        Error::RetryExhausted { attempts, .. } => assert_eq!(*attempts, 3),
        other => panic!("unexpected error: {other}"),
    }
    assert!(matches!(
        err.root_cause(),
        Error::Remote { status: 503, .. }
    ));
    assert_eq!(client.cache_stats().metadata.current_size, 0);
}

#[tokio::test(start_paused = true)]
async fn test_validation_never_reaches_upstream_or_breaker() {
    let upstream = ScriptedUpstream::new();
    let client = client_with(single_attempt_config(), &upstream);

    let err = client.search_records(&SearchRequest::new("  ")).await.unwrap_err();
    assert!(matches!(err, Error::Validation { .. }));
    assert_eq!(
        err.context().and_then(|c| c.field_path.as_deref()),
        Some("search.criteria")
    );

    let err = client
        .search_records(&SearchRequest::new("techCenter:2800").with_rows(5000))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation { .. }));

    let err = client.get_citation_details("").await.unwrap_err();
    assert!(matches!(err, Error::Validation { .. }));

    assert_eq!(upstream.total_calls(), 0);
    let snap = client.circuit_breaker().unwrap().snapshot();
    assert_eq!(snap.total_calls, 0);
    assert_eq!(snap.consecutive_failures, 0);
}

#[tokio::test(start_paused = true)]
async fn test_rejections_are_not_retried_or_degraded() {
    let upstream = ScriptedUpstream::new();
    upstream.set(Behavior::Failing(401));
    let client = client_with(ClientConfig::for_tests(), &upstream);

    let err = client.get_fields().await.unwrap_err();
    assert!(matches!(err, Error::Remote { status: 401, .. }));
    assert_eq!(upstream.fields_calls(), 1);
    assert_eq!(
        client.circuit_breaker().unwrap().snapshot().consecutive_failures,
        1
    );
}

#[tokio::test(start_paused = true)]
async fn test_hanging_upstream_times_out_and_retries() {
    let upstream = ScriptedUpstream::new();
    upstream.set(Behavior::Hanging);
    let config = ClientConfig {
        request_timeout_seconds: 5.0,
        retry_max_attempts: 2,
        ..ClientConfig::for_tests()
    };
    let client = client_with(config, &upstream);

    let started = Instant::now();
    let err = client.get_fields().await.unwrap_err();
    assert!(matches!(err, Error::RetryExhausted { attempts: 2, .. }));
    assert!(matches!(err.root_cause(), Error::Timeout { .. }));
    assert_eq!(upstream.fields_calls(), 2);
    assert!(started.elapsed() >= Duration::from_secs(10));
}

#[tokio::test(start_paused = true)]
async fn test_disabled_breaker_reports_disabled_state() {
    let upstream = ScriptedUpstream::new();
    let config = ClientConfig {
        circuit_breaker_enabled: false,
        ttl_cache_seconds: 60.0,
        ..single_attempt_config()
    };
    let client = client_with(config, &upstream);
    assert!(client.circuit_breaker().is_none());

    client.get_fields().await.unwrap();
    tokio::time::advance(Duration::from_secs(61)).await;
    upstream.set(Behavior::Failing(503));

    for _ in 0..5 {
        let degraded = client.get_fields().await.unwrap();
        assert_eq!(degraded.cache_status.unwrap().circuit_breaker, "disabled");
    }
    // Without a breaker every call reaches the upstream.
    assert_eq!(upstream.fields_calls(), 6);
}

#[tokio::test(start_paused = true)]
async fn test_citation_details() {
    let upstream = ScriptedUpstream::new();
    let client = client_with(single_attempt_config(), &upstream);

    let details = client.get_citation_details(" abc123 ").await.unwrap();
    assert_eq!(details.data["id"], "doc-id:abc123");
    assert_eq!(details.source, ResponseSource::Upstream);

    let err = client.get_citation_details("missing-1").await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
    assert!(err.to_string().contains("missing-1"));

    upstream.set(Behavior::Failing(503));
    client.circuit_breaker().unwrap().force_open();
    let degraded = client.get_citation_details("abc123").await.unwrap();
    assert_eq!(degraded.data["id"], "doc-id:abc123");
    assert_eq!(degraded.cache_status.unwrap().circuit_breaker, "open");
}

#[tokio::test(start_paused = true)]
async fn test_search_citations_shares_cache_with_search_records() {
    let upstream = ScriptedUpstream::new();
    let client = client_with(single_attempt_config(), &upstream);

    let request = SearchRequest::new("techCenter:2800")
        .with_fields(["techCenter", "id"])
        .with_rows(20);
    client.search_records(&request).await.unwrap();

    let again = client
        .search_citations("techCenter:2800", &["id", "techCenter"], 0, 20)
        .await
        .unwrap();
    assert_eq!(again.source, ResponseSource::Cache);
    assert_eq!(upstream.search_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_signals_reflect_components() {
    let upstream = ScriptedUpstream::new();
    let config = ClientConfig {
        max_inflight: Some(4),
        ..single_attempt_config()
    };
    let client = client_with(config, &upstream);
    client.get_fields().await.unwrap();

    let signals = client.signals();
    let inflight = signals.inflight.unwrap();
    assert_eq!(inflight.max, 4);
    assert_eq!(inflight.in_use, 0);
    assert_eq!(signals.circuit_breaker.unwrap().state, CircuitState::Closed);
    assert_eq!(signals.cache.metadata.current_size, 1);
    assert!(!signals.rate_limiter.enabled);

    client.clear_caches();
    assert_eq!(client.cache_stats().metadata.current_size, 0);
}

#[tokio::test(start_paused = true)]
async fn test_unrepresentable_ttl_rejected_at_build() {
    let upstream = ScriptedUpstream::new();
    let config = ClientConfig {
        ttl_cache_seconds: 1e19,
        ..single_attempt_config()
    };
    let err = enriched_citation_client::ResilientClient::builder(config)
        .upstream(upstream.clone())
        .build()
        .err()
        .expect("oversized TTL must not build");
    assert!(matches!(err, Error::Configuration { .. }));
}

#[tokio::test(start_paused = true)]
async fn test_longest_allowed_ttl_serves_fields() {
    let upstream = ScriptedUpstream::new();
    let config = ClientConfig {
        ttl_cache_seconds: enriched_citation_client::config::MAX_DURATION_SECONDS,
        ..single_attempt_config()
    };
    let client = client_with(config, &upstream);

    client.get_fields().await.unwrap();
    let cached = client.get_fields().await.unwrap();
    assert_eq!(cached.source, ResponseSource::Cache);
    assert_eq!(upstream.fields_calls(), 1);
}
