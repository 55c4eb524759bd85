//! Upstream source clients for the collection pipeline.
//!
//! Three collectors feed the pipeline: GitHub repository search, a
//! web-search API, and a page scraper for cheat-sheet sites. All implement
//! [`SourceClient`] and share one failure contract: an upstream error is
//! logged and yields an empty result set, so no single source can abort a
//! collection cycle.

pub mod github;
pub mod normalize;
pub mod ratelimit;
pub mod scrape;
pub mod websearch;

use async_trait::async_trait;
use reqwest::Client;
use secfeed_shared::{Resource, Result, SecfeedError, SourceTag};

pub use github::GithubClient;
pub use ratelimit::RetryPolicy;
pub use scrape::ScrapeClient;
pub use websearch::WebSearchClient;

/// Maximum number of redirects any source request follows.
const MAX_REDIRECTS: usize = 3;

/// Default timeout in seconds for source requests.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// User-Agent string for all source requests.
const USER_AGENT: &str = concat!("secfeed/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// SourceClient
// ---------------------------------------------------------------------------

/// One upstream collector.
///
/// `target` is a search query for the query-based sources and a page URL
/// for the scraper. Implementations never propagate upstream failures.
#[async_trait]
pub trait SourceClient: Send + Sync {
    /// Attribution tag stamped on every resource this client produces.
    fn tag(&self) -> SourceTag;

    /// Fetch and normalize resources for one target.
    async fn fetch(&self, target: &str) -> Vec<Resource>;
}

/// Build a reqwest client with the shared source settings.
pub(crate) fn build_http_client(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| SecfeedError::Network(format!("failed to build HTTP client: {e}")))
}
