//! GitHub repository search client.
//!
//! Queries `GET /search/repositories` and normalizes each hit into a
//! repository resource. Throttling (429) is retried within the policy
//! budget; every other failure is logged and yields an empty set.

use async_trait::async_trait;
use reqwest::{Client, header};
use secfeed_shared::{Resource, Result, SecfeedError, SourceTag};
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::ratelimit::{self, RetryPolicy};
use crate::{DEFAULT_TIMEOUT_SECS, SourceClient, build_http_client, normalize};

/// GitHub repository search client.
pub struct GithubClient {
    client: Client,
    api_url: String,
    token: String,
    max_results: u32,
    policy: RetryPolicy,
}

/// Wire shape of `GET /search/repositories`.
#[derive(Debug, Deserialize)]
struct SearchReposResponse {
    items: Vec<RepoItem>,
}

#[derive(Debug, Deserialize)]
struct RepoItem {
    name: String,
    #[serde(default)]
    description: Option<String>,
    html_url: String,
}

impl GithubClient {
    /// Create a client against `api_url` (the real API or a test server).
    pub fn new(
        api_url: impl Into<String>,
        token: impl Into<String>,
        max_results: u32,
        policy: RetryPolicy,
    ) -> Result<Self> {
        Ok(Self {
            client: build_http_client(DEFAULT_TIMEOUT_SECS)?,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            max_results,
            policy,
        })
    }

    async fn search_repositories(&self, query: &str) -> Result<Vec<Resource>> {
        let url = format!("{}/search/repositories", self.api_url);
        let per_page = self.max_results.to_string();
        let request = self
            .client
            .get(&url)
            .query(&[("q", query), ("per_page", per_page.as_str())])
            .header(header::AUTHORIZATION, format!("token {}", self.token))
            .header(header::ACCEPT, "application/vnd.github.v3+json");

        let response = ratelimit::send_with_backoff(request, &self.policy).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SecfeedError::Network(format!("{url}: HTTP {status}")));
        }

        let parsed: SearchReposResponse = response
            .json()
            .await
            .map_err(|e| SecfeedError::parse(format!("{url}: {e}")))?;

        Ok(parsed
            .items
            .iter()
            .map(|item| normalize::repo(&item.name, item.description.as_deref(), &item.html_url))
            .collect())
    }
}

#[async_trait]
impl SourceClient for GithubClient {
    fn tag(&self) -> SourceTag {
        SourceTag::Github
    }

    #[instrument(skip_all, fields(source = "github", query = %target))]
    async fn fetch(&self, target: &str) -> Vec<Resource> {
        match self.search_repositories(target).await {
            Ok(resources) => {
                debug!(count = resources.len(), "repository search complete");
                resources
            }
            Err(e) => {
                warn!(error = %e, "failed to fetch repositories");
                Vec::new()
            }
        }
    }
}
