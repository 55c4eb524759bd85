//! Web-search API client.
//!
//! Queries a SerpApi-style endpoint and normalizes each organic result into
//! a search-result resource. The API key travels as a query parameter, per
//! the upstream contract.

use async_trait::async_trait;
use reqwest::Client;
use secfeed_shared::{Resource, Result, SecfeedError, SourceTag};
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::ratelimit::{self, RetryPolicy};
use crate::{DEFAULT_TIMEOUT_SECS, SourceClient, build_http_client, normalize};

/// Web-search API client.
pub struct WebSearchClient {
    client: Client,
    endpoint: String,
    api_key: String,
    max_results: u32,
    policy: RetryPolicy,
}

/// Wire shape of the search response. Responses without organic results
/// (empty result pages, some error payloads) normalize to an empty list.
#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    organic_results: Vec<OrganicResult>,
}

#[derive(Debug, Deserialize)]
struct OrganicResult {
    title: String,
    #[serde(default)]
    snippet: Option<String>,
    link: String,
}

impl WebSearchClient {
    /// Create a client against `endpoint` (the real API or a test server).
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        max_results: u32,
        policy: RetryPolicy,
    ) -> Result<Self> {
        Ok(Self {
            client: build_http_client(DEFAULT_TIMEOUT_SECS)?,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            max_results,
            policy,
        })
    }

    async fn search(&self, query: &str) -> Result<Vec<Resource>> {
        let num = self.max_results.to_string();
        let request = self.client.get(&self.endpoint).query(&[
            ("api_key", self.api_key.as_str()),
            ("q", query),
            ("num", num.as_str()),
        ]);

        let response = ratelimit::send_with_backoff(request, &self.policy).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SecfeedError::Network(format!(
                "{}: HTTP {status}",
                self.endpoint
            )));
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| SecfeedError::parse(format!("{}: {e}", self.endpoint)))?;

        Ok(parsed
            .organic_results
            .iter()
            .map(|hit| normalize::search_hit(&hit.title, hit.snippet.as_deref(), &hit.link))
            .collect())
    }
}

#[async_trait]
impl SourceClient for WebSearchClient {
    fn tag(&self) -> SourceTag {
        SourceTag::WebSearch
    }

    #[instrument(skip_all, fields(source = "websearch", query = %target))]
    async fn fetch(&self, target: &str) -> Vec<Resource> {
        match self.search(target).await {
            Ok(resources) => {
                debug!(count = resources.len(), "web search complete");
                resources
            }
            Err(e) => {
                warn!(error = %e, "failed to fetch search results");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn quick_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            default_backoff: Duration::from_millis(20),
            max_backoff: Duration::from_secs(300),
        }
    }

    fn test_client(server: &MockServer) -> WebSearchClient {
        WebSearchClient::new(
            format!("{}/search", server.uri()),
            "test-key",
            10,
            quick_policy(),
        )
        .expect("client")
    }

    #[tokio::test]
    async fn search_normalizes_organic_results() {
        let server = MockServer::start().await;
        let body = std::fs::read_to_string("../../../fixtures/json/websearch.fixture.json")
            .expect("read fixture");
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("api_key", "test-key"))
            .and(query_param("q", "cybersecurity tabletop exercises"))
            .and(query_param("num", "10"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let resources = client.fetch("cybersecurity tabletop exercises").await;

        assert_eq!(resources.len(), 2);
        assert_eq!(resources[0].title, "Tabletop Exercise Templates");
        assert_eq!(
            resources[0].description,
            "Ready-made incident response scenarios"
        );
        assert_eq!(resources[0].url, "https://example.org/tabletop");
        assert_eq!(resources[0].source, SourceTag::WebSearch);
        // Second fixture hit has no snippet field.
        assert_eq!(resources[1].description, normalize::NO_SNIPPET);
    }

    #[tokio::test]
    async fn missing_organic_results_yields_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(r#"{"search_metadata":{"id":"x"}}"#),
            )
            .mount(&server)
            .await;

        let client = test_client(&server);
        assert!(client.fetch("anything").await.is_empty());
    }

    #[tokio::test]
    async fn http_error_yields_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let client = test_client(&server);
        assert!(client.fetch("anything").await.is_empty());
    }
}
