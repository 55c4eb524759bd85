//! Page scraper for cheat-sheet sites.
//!
//! Fetches a configured page and lifts every non-blank `<code>` element
//! into a command resource attributed to the page URL. No link following:
//! one target, one page.

use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use secfeed_shared::{Resource, Result, SecfeedError, SourceTag};
use tracing::{debug, instrument, warn};
use url::Url;

use crate::ratelimit::{self, RetryPolicy};
use crate::{DEFAULT_TIMEOUT_SECS, SourceClient, build_http_client, normalize};

/// Command scraper for a single page.
pub struct ScrapeClient {
    client: Client,
    policy: RetryPolicy,
}

impl ScrapeClient {
    pub fn new(policy: RetryPolicy) -> Result<Self> {
        Ok(Self {
            client: build_http_client(DEFAULT_TIMEOUT_SECS)?,
            policy,
        })
    }

    async fn scrape_page(&self, page_url: &Url) -> Result<Vec<Resource>> {
        let request = self.client.get(page_url.as_str());
        let response = ratelimit::send_with_backoff(request, &self.policy).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SecfeedError::Network(format!("{page_url}: HTTP {status}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| SecfeedError::Network(format!("{page_url}: failed to read body: {e}")))?;

        Ok(extract_commands(&body, page_url.as_str()))
    }
}

/// Extract every non-blank `<code>` element as a command resource.
pub(crate) fn extract_commands(html: &str, page_url: &str) -> Vec<Resource> {
    let doc = Html::parse_document(html);
    let code_sel = Selector::parse("code").unwrap();

    doc.select(&code_sel)
        .filter_map(|el| normalize::command(&el.text().collect::<String>(), page_url))
        .collect()
}

#[async_trait]
impl SourceClient for ScrapeClient {
    fn tag(&self) -> SourceTag {
        SourceTag::Scrape
    }

    #[instrument(skip_all, fields(source = "scrape", page = %target))]
    async fn fetch(&self, target: &str) -> Vec<Resource> {
        let page_url = match Url::parse(target) {
            Ok(url) => url,
            Err(e) => {
                warn!(target, error = %e, "invalid scrape target");
                return Vec::new();
            }
        };

        match self.scrape_page(&page_url).await {
            Ok(resources) => {
                debug!(count = resources.len(), "page scrape complete");
                resources
            }
            Err(e) => {
                warn!(error = %e, "failed to scrape page");
                Vec::new()
            }
        }
    }
}
