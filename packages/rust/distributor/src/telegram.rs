//! Telegram sink, posting through the Bot API `sendMessage` method.

use reqwest::Client;
use serde::Serialize;

use secfeed_shared::{Result, SecfeedError};

use crate::render::RenderedMessage;
use crate::{Sink, build_http_client};

/// Posts each resource as a Markdown message to one Telegram chat.
pub struct TelegramSink {
    client: Client,
    api_base: String,
    token: String,
    chat_id: String,
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: String,
    parse_mode: &'static str,
}

impl TelegramSink {
    /// Build a sink for one bot token and chat. `api_base` is the Bot API
    /// root, normally `https://api.telegram.org`.
    pub fn new(
        api_base: impl Into<String>,
        token: impl Into<String>,
        chat_id: impl Into<String>,
    ) -> Result<Self> {
        Ok(Self {
            client: build_http_client()?,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token: token.into(),
            chat_id: chat_id.into(),
        })
    }
}

fn message_text(message: &RenderedMessage) -> String {
    format!(
        "**{}**\n{}\nSource: {}",
        message.title,
        message.fenced_body(),
        message.source
    )
}

#[async_trait::async_trait]
impl Sink for TelegramSink {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn deliver(&self, message: &RenderedMessage) -> Result<()> {
        let url = format!("{}/bot{}/sendMessage", self.api_base, self.token);
        let body = SendMessage {
            chat_id: &self.chat_id,
            text: message_text(message),
            parse_mode: "Markdown",
        };

        let response = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                // The URL carries the bot token; strip it from the error.
                SecfeedError::Delivery(format!("telegram request failed: {}", e.without_url()))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(SecfeedError::Delivery(format!(
                "telegram responded {status}: {detail}"
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

    fn prose_message() -> RenderedMessage {
        RenderedMessage {
            title: "nmap-scripts".into(),
            body: "Collection of nmap NSE scripts".into(),
            source: "GitHub".into(),
            code_block: false,
        }
    }

    #[tokio::test]
    async fn posts_send_message_with_markdown() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/bot123456:test-token/sendMessage"))
            .and(body_json(json!({
                "chat_id": "@secfeed",
                "text": "**nmap-scripts**\nCollection of nmap NSE scripts\nSource: GitHub",
                "parse_mode": "Markdown",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let sink = TelegramSink::new(server.uri(), "123456:test-token", "@secfeed")
            .expect("build sink");

        sink.deliver(&prose_message()).await.expect("deliver");
    }

    #[tokio::test]
    async fn fences_code_snippets() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/bot123456:test-token/sendMessage"))
            .and(body_json(json!({
                "chat_id": "@secfeed",
                "text": "**Simple Port Scanner**\n```\nimport socket\n```\nSource: Curated",
                "parse_mode": "Markdown",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let sink = TelegramSink::new(server.uri(), "123456:test-token", "@secfeed")
            .expect("build sink");

        let message = RenderedMessage {
            title: "Simple Port Scanner".into(),
            body: "import socket".into(),
            source: "Curated".into(),
            code_block: true,
        };
        sink.deliver(&message).await.expect("deliver");
    }

    #[tokio::test]
    async fn api_error_is_a_delivery_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "ok": false,
                "description": "Unauthorized",
            })))
            .mount(&server)
            .await;

        let sink =
            TelegramSink::new(server.uri(), "bad-token", "@secfeed").expect("build sink");

        let err = sink.deliver(&prose_message()).await.expect_err("deliver");
        assert!(matches!(err, SecfeedError::Delivery(_)));
        assert!(err.to_string().contains("401"));
    }
}
