//! Discord sink, posting embeds through an incoming webhook.

use reqwest::Client;
use serde::Serialize;

use secfeed_shared::{Result, SecfeedError};

use crate::render::RenderedMessage;
use crate::{Sink, build_http_client};

/// Embed accent color (Discord's standard blue).
const EMBED_COLOR: u32 = 3_447_003;

/// Posts each resource as an embed to one Discord webhook.
pub struct DiscordSink {
    client: Client,
    webhook_url: String,
}

#[derive(Serialize)]
struct WebhookPayload {
    embeds: Vec<Embed>,
}

#[derive(Serialize)]
struct Embed {
    title: String,
    description: String,
    color: u32,
    fields: Vec<EmbedField>,
}

#[derive(Serialize)]
struct EmbedField {
    name: &'static str,
    value: String,
    inline: bool,
}

impl DiscordSink {
    /// Build a sink for one webhook URL. The URL embeds its own secret, so
    /// it must never appear in logs or error messages.
    pub fn new(webhook_url: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: build_http_client()?,
            webhook_url: webhook_url.into(),
        })
    }
}

fn payload(message: &RenderedMessage) -> WebhookPayload {
    WebhookPayload {
        embeds: vec![Embed {
            title: message.title.clone(),
            description: message.fenced_body(),
            color: EMBED_COLOR,
            fields: vec![EmbedField {
                name: "Source",
                value: message.source.clone(),
                inline: false,
            }],
        }],
    }
}

#[async_trait::async_trait]
impl Sink for DiscordSink {
    fn name(&self) -> &str {
        "discord"
    }

    async fn deliver(&self, message: &RenderedMessage) -> Result<()> {
        let response = self
            .client
            .post(&self.webhook_url)
            .json(&payload(message))
            .send()
            .await
            .map_err(|e| {
                // The URL carries the webhook secret; strip it from the error.
                SecfeedError::Delivery(format!("discord request failed: {}", e.without_url()))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(SecfeedError::Delivery(format!(
                "discord responded {status}: {detail}"
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
    async fn posts_embed_with_source_field() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/webhooks/123/abc"))
            .and(body_json(json!({
                "embeds": [{
                    "title": "nmap-scripts",
                    "description": "Collection of nmap NSE scripts",
                    "color": 3_447_003,
                    "fields": [{"name": "Source", "value": "GitHub", "inline": false}],
                }],
            })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let sink = DiscordSink::new(format!("{}/api/webhooks/123/abc", server.uri()))
            .expect("build sink");

        let message = RenderedMessage {
            title: "nmap-scripts".into(),
            body: "Collection of nmap NSE scripts".into(),
            source: "GitHub".into(),
            code_block: false,
        };
        sink.deliver(&message).await.expect("deliver");
    }

    #[tokio::test]
    async fn fences_code_snippets() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(body_json(json!({
                "embeds": [{
                    "title": "Simple Port Scanner",
                    "description": "```\nimport socket\n```",
                    "color": 3_447_003,
                    "fields": [{"name": "Source", "value": "Curated", "inline": false}],
                }],
            })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let sink = DiscordSink::new(format!("{}/hook", server.uri())).expect("build sink");

        let message = RenderedMessage {
            title: "Simple Port Scanner".into(),
            body: "import socket".into(),
            source: "Curated".into(),
            code_block: true,
        };
        sink.deliver(&message).await.expect("deliver");
    }

    #[tokio::test]
    async fn webhook_error_is_a_delivery_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "message": "Unknown Webhook",
                "code": 10015,
            })))
            .mount(&server)
            .await;

        let sink = DiscordSink::new(format!("{}/hook", server.uri())).expect("build sink");

        let message = RenderedMessage {
            title: "x".into(),
            body: "y".into(),
            source: "GitHub".into(),
            code_block: false,
        };
        let err = sink.deliver(&message).await.expect_err("deliver");
        assert!(matches!(err, SecfeedError::Delivery(_)));
        assert!(err.to_string().contains("404"));
    }
}
