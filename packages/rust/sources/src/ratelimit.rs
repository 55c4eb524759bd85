//! Bounded backoff for throttled upstreams.
//!
//! HTTP 429 is the only retryable signal. The wait comes from the
//! `Retry-After` header in delta-seconds form, falling back to a policy
//! default when the header is absent or unparsable, and always capped.
//! Sleeping is task-local: a throttled source never blocks the others.

use std::time::Duration;

use reqwest::header::RETRY_AFTER;
use reqwest::{RequestBuilder, Response, StatusCode};
use secfeed_shared::{Result, RetryConfig, SecfeedError};
use tracing::warn;

/// Runtime throttling policy, derived from the `[retry]` config section.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total request attempts before the fetch is abandoned.
    pub max_attempts: u32,
    /// Wait applied when `Retry-After` is absent or unparsable.
    pub default_backoff: Duration,
    /// Upper bound on any single wait.
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            default_backoff: Duration::from_secs(config.default_backoff_secs),
            max_backoff: Duration::from_secs(config.max_backoff_secs),
        }
    }
}

/// Send `request`, sleeping and retrying on 429 within the policy's attempt
/// budget. Any other status, success or failure, is returned as-is for the
/// caller to interpret.
pub async fn send_with_backoff(request: RequestBuilder, policy: &RetryPolicy) -> Result<Response> {
    let mut attempt = 1u32;
    loop {
        let req = request.try_clone().ok_or_else(|| {
            SecfeedError::Network("request is not retryable (streaming body)".into())
        })?;
        let response = req
            .send()
            .await
            .map_err(|e| SecfeedError::Network(e.to_string()))?;

        if response.status() != StatusCode::TOO_MANY_REQUESTS {
            return Ok(response);
        }
        if attempt >= policy.max_attempts {
            return Err(SecfeedError::Network(format!(
                "upstream still throttling after {attempt} attempts"
            )));
        }

        let wait = advisory_wait(&response, policy);
        warn!(
            attempt,
            wait_secs = wait.as_secs(),
            "rate limit hit, backing off"
        );
        tokio::time::sleep(wait).await;
        attempt += 1;
    }
}

/// The wait a throttling response advises.
fn advisory_wait(response: &Response, policy: &RetryPolicy) -> Duration {
    let advised = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(policy.default_backoff);
    advised.min(policy.max_backoff)
}
