//! Mock HTTP server setup for integration tests

use enriched_citation_client::{ClientConfig, HttpTransport, ResilientClient};
use mockito::{Matcher, Mock, Server, ServerGuard};
use std::sync::Arc;

pub const TEST_API_KEY: &str = "test-key";

/// Test fixture that manages a mock server
pub struct MockServerFixture {
    pub server: ServerGuard,
    pub base_url: String,
}

impl MockServerFixture {
    pub async fn new() -> Self {
        let server = Server::new_async().await;
        let base_url = server.url();
        Self { server, base_url }
    }

    /// Configuration pointing at the mock server.
    pub fn config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.base_url.clone(),
            api_key: Some(TEST_API_KEY.to_string()),
            request_timeout_seconds: 5.0,
            ..ClientConfig::for_tests()
        }
    }

    pub fn transport(&self) -> HttpTransport {
        HttpTransport::new(&self.config()).expect("transport should build")
    }

    pub fn client(&self, config: ClientConfig) -> ResilientClient {
        let transport = HttpTransport::new(&config).expect("transport should build");
        ResilientClient::builder(config)
            .upstream(Arc::new(transport))
            .build()
            .expect("client should build")
    }

    /// A successful JSON response on `path` for any method.
    pub async fn mock_json(&mut self, method: &str, path: &str, body: &str) -> Mock {
        self.server
            .mock(method, path)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await
    }

    pub async fn mock_status(
        &mut self,
        method: &str,
        path: &str,
        status: usize,
        body: &str,
        hits: usize,
    ) -> Mock {
        self.server
            .mock(method, path)
            .match_header("authorization", Matcher::Any)
            .with_status(status)
            .with_header("content-type", "application/json")
            .with_body(body)
            .expect(hits)
            .create_async()
            .await
    }
}
