use crate::integration::scripted_upstream::{client_with, ScriptedUpstream};
use enriched_citation_client::resilience::{RateLimiter, RateLimiterConfig};
use enriched_citation_client::{ClientConfig, Error, ResilientClient, SearchRequest};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_test::{assert_err, assert_ok};

fn limited_config(rpm: u32, burst: u32) -> ClientConfig {
    ClientConfig {
        rate_limiting_enabled: true,
        rate_limit_per_minute: rpm,
        rate_limit_burst: Some(burst),
        ..ClientConfig::for_tests()
    }
}

#[tokio::test(start_paused = true)]
async fn test_limiter_delays_instead_of_rejecting() {
    let upstream = ScriptedUpstream::new();
    let client = client_with(limited_config(60, 2), &upstream);

    let started = Instant::now();
    for i in 0..4 {
        client
            .search_records(&SearchRequest::new(format!("q{}", i)))
            .await
            .unwrap();
    }
    let elapsed = started.elapsed();

    assert_eq!(upstream.search_calls(), 4);
    assert!(elapsed >= Duration::from_millis(1990), "{elapsed:?}");
    assert!(elapsed < Duration::from_millis(2500), "{elapsed:?}");

    let snap = client.rate_limiter().snapshot();
    assert_eq!(snap.acquired, 4);
    assert_eq!(snap.delayed, 2);
    assert_eq!(snap.timed_out, 0);
}

#[tokio::test(start_paused = true)]
async fn test_cache_hits_do_not_consume_tokens() {
    let upstream = ScriptedUpstream::new();
    let client = client_with(limited_config(60, 1), &upstream);

    let started = Instant::now();
    for _ in 0..5 {
        client.get_fields().await.unwrap();
    }
    assert_eq!(upstream.fields_calls(), 1);
    assert!(started.elapsed() < Duration::from_millis(10));
    assert_eq!(client.rate_limiter().snapshot().acquired, 1);
}

#[tokio::test(start_paused = true)]
async fn test_bounded_wait_fails_without_calling_upstream() {
    let upstream = ScriptedUpstream::new();
    let config = ClientConfig {
        rate_limit_max_wait_seconds: Some(0.5),
        ..limited_config(60, 1)
    };
    let client = client_with(config, &upstream);

    assert_ok!(client.search_records(&SearchRequest::new("a")).await);
    let err = assert_err!(client.search_records(&SearchRequest::new("b")).await);
    assert!(matches!(err, Error::RateLimitTimeout { .. }));
    assert!(!err.counts_as_failure());
    assert_eq!(upstream.search_calls(), 1);
    assert_eq!(client.rate_limiter().snapshot().timed_out, 1);
}

#[tokio::test(start_paused = true)]
async fn test_shared_limiter_across_clients() {
    let upstream = ScriptedUpstream::new();
    let limiter = Arc::new(RateLimiter::named(
        "shared",
        RateLimiterConfig::from_rpm(60).with_burst(1),
    ));
    let build = || -> ResilientClient {
        ResilientClient::builder(ClientConfig::for_tests())
            .upstream(upstream.clone())
            .rate_limiter(limiter.clone())
            .build()
            .unwrap()
    };
    let a = build();
    let b = build();

    let started = Instant::now();
    a.search_records(&SearchRequest::new("a")).await.unwrap();
    b.search_records(&SearchRequest::new("b")).await.unwrap();
    assert!(started.elapsed() >= Duration::from_millis(990));
    assert_eq!(limiter.snapshot().acquired, 2);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_callers_are_spaced() {
    let upstream = ScriptedUpstream::new();
    let client = client_with(limited_config(120, 1), &upstream);

    let started = Instant::now();
    let handles: Vec<_> = (0..3)
        .map(|i| {
            let client = client.clone();
            tokio::spawn(async move {
                client
                    .search_records(&SearchRequest::new(format!("c{}", i)))
                    .await
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    // Two refills at 2 tokens/s.
    assert!(started.elapsed() >= Duration::from_millis(990));
    assert_eq!(upstream.search_calls(), 3);
}
