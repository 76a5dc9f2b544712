//! HTTP transport against a mock server.

use crate::integration::mock_server::{MockServerFixture, TEST_API_KEY};
use enriched_citation_client::transport::{FIELDS_PATH, RECORDS_PATH};
use enriched_citation_client::{CitationApi, ClientConfig, Error, ResponseSource, SearchRequest};
use mockito::Matcher;

const FIELDS_JSON: &str = r#"{"apiKey":"enriched_cited_reference_metadata","fieldCount":2,"fields":["id","techCenter"]}"#;
const RECORDS_JSON: &str =
    r#"{"response":{"numFound":1,"start":0,"docs":[{"id":"abc","techCenter":"2800"}]}}"#;

#[tokio::test]
async fn test_fields_sends_auth_and_request_id() {
    let mut fixture = MockServerFixture::new().await;
    let mock = fixture
        .server
        .mock("GET", FIELDS_PATH)
        .match_header("authorization", format!("Bearer {}", TEST_API_KEY).as_str())
        .match_header("x-request-id", "req-123")
        .match_header("accept", "application/json")
        .with_status(200)
        .with_header("content-type", "application/json; charset=utf-8")
        .with_body(FIELDS_JSON)
        .create_async()
        .await;

    let body = fixture.transport().fetch_fields("req-123").await.unwrap();
    assert_eq!(body["fieldCount"], 2);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_records_posts_form() {
    let mut fixture = MockServerFixture::new().await;
    let mock = fixture
        .server
        .mock("POST", RECORDS_PATH)
        .match_header("content-type", "application/x-www-form-urlencoded")
        .match_body(Matcher::AllOf(vec![
            Matcher::UrlEncoded("criteria".into(), "techCenter:2800".into()),
            Matcher::UrlEncoded("start".into(), "0".into()),
            Matcher::UrlEncoded("rows".into(), "10".into()),
            Matcher::UrlEncoded("fl".into(), "id,techCenter".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(RECORDS_JSON)
        .create_async()
        .await;

    let request = SearchRequest::new("techCenter:2800")
        .with_rows(10)
        .with_fields(["id", "techCenter"]);
    let body = fixture.transport().search(&request, "req-1").await.unwrap();
    assert_eq!(body["response"]["docs"][0]["id"], "abc");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_server_errors_are_retried() {
    let mut fixture = MockServerFixture::new().await;
    let mock = fixture
        .mock_status("GET", FIELDS_PATH, 500, r#"{"error":"boom"}"#, 3)
        .await;

    let client = fixture.client(fixture.config());
    let err = client.get_fields().await.unwrap_err();
    assert!(matches!(err, Error::RetryExhausted { attempts: 3, .. }));
    match err.root_cause() {
        Error::Remote {
            status, message, ..
        } => {
            assert_eq!(*status, 500);
            assert_eq!(message, "boom");
        }
        other => panic!("unexpected root cause: {other}"),
    }
    mock.assert_async().await;
}

#[tokio::test]
async fn test_auth_failure_is_not_retried() {
    let mut fixture = MockServerFixture::new().await;
    let mock = fixture
        .mock_status(
            "GET",
            FIELDS_PATH,
            401,
            r#"{"error":{"message":"Invalid API key"}}"#,
            1,
        )
        .await;

    let client = fixture.client(fixture.config());
    let err = client.get_fields().await.unwrap_err();
    match &err {
        Error::Remote { status, message, .. } => {
            assert_eq!(*status, 401);
            assert_eq!(message, "Invalid API key");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.context().and_then(|c| c.request_id.as_ref()).is_some());
    mock.assert_async().await;
}

#[tokio::test]
async fn test_retry_after_is_captured() {
    let mut fixture = MockServerFixture::new().await;
    let _mock = fixture
        .server
        .mock("GET", FIELDS_PATH)
        .with_status(429)
        .with_header("retry-after", "2")
        .with_body("slow down")
        .create_async()
        .await;

    let err = fixture.transport().fetch_fields("req-1").await.unwrap_err();
    match err {
        Error::Remote {
            status,
            retry_after_ms,
            message,
            ..
        } => {
            assert_eq!(status, 429);
            assert_eq!(retry_after_ms, Some(2000));
            assert_eq!(message, "slow down");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_unexpected_content_type_rejected() {
    let mut fixture = MockServerFixture::new().await;
    let _mock = fixture
        .server
        .mock("GET", FIELDS_PATH)
        .with_status(200)
        .with_header("content-type", "text/html")
        .with_body("<html>maintenance</html>")
        .create_async()
        .await;

    let err = fixture.transport().fetch_fields("req-1").await.unwrap_err();
    assert!(matches!(err, Error::InvalidResponse { .. }));
    assert!(err.to_string().contains("Unexpected Content-Type: text/html"));
}

#[tokio::test]
async fn test_invalid_json_rejected() {
    let mut fixture = MockServerFixture::new().await;
    let _mock = fixture
        .mock_json("GET", FIELDS_PATH, "{not json")
        .await;

    let err = fixture.transport().fetch_fields("req-1").await.unwrap_err();
    assert!(matches!(err, Error::InvalidResponse { .. }));
    assert!(err.to_string().contains("not valid JSON"));
}

#[tokio::test]
async fn test_error_body_in_successful_search() {
    let mut fixture = MockServerFixture::new().await;
    let _mock = fixture
        .mock_json("POST", RECORDS_PATH, r#"{"error":"undefined field foo"}"#)
        .await;

    let err = fixture
        .transport()
        .search(&SearchRequest::new("foo:bar"), "req-1")
        .await
        .unwrap_err();
    assert!(err.to_string().contains("API error: undefined field foo"));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_oversized_response_rejected() {
    let mut fixture = MockServerFixture::new().await;
    let big = format!(r#"{{"padding":"{}"}}"#, "x".repeat(512));
    let _mock = fixture.mock_json("GET", FIELDS_PATH, &big).await;

    let config = ClientConfig {
        max_response_bytes: 128,
        response_warn_bytes: 64,
        ..fixture.config()
    };
    let transport = enriched_citation_client::HttpTransport::new(&config).unwrap();
    let err = transport.fetch_fields("req-1").await.unwrap_err();
    assert!(err.to_string().contains("Response too large"));
}

#[tokio::test]
async fn test_client_caches_fields_over_http() {
    let mut fixture = MockServerFixture::new().await;
    let mock = fixture
        .server
        .mock("GET", FIELDS_PATH)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(FIELDS_JSON)
        .expect(1)
        .create_async()
        .await;

    let client = fixture.client(fixture.config());
    let first = client.get_fields().await.unwrap();
    let second = client.get_fields().await.unwrap();
    assert_eq!(first.source, ResponseSource::Upstream);
    assert_eq!(second.source, ResponseSource::Cache);
    assert_eq!(first.data, second.data);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_connection_refused_is_transport_error() {
    let config = ClientConfig {
        base_url: "http://127.0.0.1:9".to_string(),
        connect_timeout_seconds: 1.0,
        request_timeout_seconds: 2.0,
        ..ClientConfig::for_tests()
    };
    let transport = enriched_citation_client::HttpTransport::new(&config).unwrap();
    let err = transport.fetch_fields("req-1").await.unwrap_err();
    assert!(err.is_retryable());
    assert!(err.counts_as_failure());
}
