//! Generic JSON webhook sink.
//!
//! Posts the rendered message as-is; the receiving end decides how to
//! format it. Covers chat systems and automation endpoints the pipeline
//! has no dedicated sink for.

use reqwest::Client;

use secfeed_shared::{Result, SecfeedError};

use crate::render::RenderedMessage;
use crate::{Sink, build_http_client};

/// Posts each resource as plain JSON to one configured endpoint.
pub struct WebhookSink {
    client: Client,
    name: String,
    url: String,
}

impl WebhookSink {
    /// Build a sink for one endpoint. `name` identifies it in logs and
    /// delivery reports.
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: build_http_client()?,
            name: name.into(),
            url: url.into(),
        })
    }
}

#[async_trait::async_trait]
impl Sink for WebhookSink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn deliver(&self, message: &RenderedMessage) -> Result<()> {
        let response = self
            .client
            .post(&self.url)
            .json(message)
            .send()
            .await
            .map_err(|e| {
                SecfeedError::Delivery(format!("{} request failed: {}", self.name, e.without_url()))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(SecfeedError::Delivery(format!(
                "{} responded {status}: {detail}",
                self.name
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[tokio::test]
    async fn posts_rendered_message_as_json() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/secfeed"))
            .and(body_json(json!({
                "title": "Command: whoami...",
                "body": "whoami",
                "source": "Scraper",
                "code_block": false,
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let sink =
            WebhookSink::new("ops", format!("{}/secfeed", server.uri())).expect("build sink");
        assert_eq!(sink.name(), "ops");

        let message = RenderedMessage {
            title: "Command: whoami...".into(),
            body: "whoami".into(),
            source: "Scraper".into(),
            code_block: false,
        };
        sink.deliver(&message).await.expect("deliver");
    }

    #[tokio::test]
    async fn endpoint_error_is_a_delivery_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let sink = WebhookSink::new("ops", server.uri()).expect("build sink");

        let message = RenderedMessage {
            title: "x".into(),
            body: "y".into(),
            source: "GitHub".into(),
            code_block: false,
        };
        let err = sink.deliver(&message).await.expect_err("deliver");
        assert!(matches!(err, SecfeedError::Delivery(_)));
        assert!(err.to_string().contains("ops"));
    }
}
