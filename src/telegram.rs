use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

const API_BASE: &str = "https://api.telegram.org";

/// One webhook payload from Telegram. Everything beyond the fields we act on
/// is ignored; a body that fails to parse becomes the empty update.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Update {
    pub message: Option<IncomingMessage>,
    pub edited_message: Option<IncomingMessage>,
}

impl Update {
    /// The message to act on: `message` if present, else `edited_message`.
    pub fn effective_message(&self) -> Option<&IncomingMessage> {
        self.message.as_ref().or(self.edited_message.as_ref())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct IncomingMessage {
    pub chat: Chat,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: i64,
    text: &'a str,
}

/// Envelope every Bot API method responds with.
#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    description: Option<String>,
}

/// Thin client for the two Bot API methods this service needs.
pub struct TelegramClient {
    client: reqwest::Client,
    base_url: String,
}

impl TelegramClient {
    pub fn new(bot_token: &str) -> Result<Self> {
        Self::with_base_url(format!("{API_BASE}/bot{bot_token}"))
    }

    /// Point the client at an arbitrary base URL (tests use a mock server).
    pub fn with_base_url(base_url: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client, base_url })
    }

    /// POST `{base}/sendMessage`. Best-effort from the caller's point of
    /// view: the caller logs a failure and moves on.
    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<()> {
        let url = format!("{}/sendMessage", self.base_url);
        debug!("sendMessage -> chat {}", chat_id);

        let response = self
            .client
            .post(&url)
            .json(&SendMessageRequest { chat_id, text })
            .send()
            .await
            .context("Failed to send sendMessage request")?;

        check_api_response(response, "sendMessage").await
    }

    /// POST `{base}/setWebhook` with a form-encoded `url` field. Idempotent
    /// on the Telegram side; safe to call repeatedly with the same URL.
    pub async fn set_webhook(&self, webhook_url: &str) -> Result<()> {
        let url = format!("{}/setWebhook", self.base_url);

        let response = self
            .client
            .post(&url)
            .form(&[("url", webhook_url)])
            .send()
            .await
            .context("Failed to send setWebhook request")?;

        check_api_response(response, "setWebhook").await
    }
}

/// Success means both an HTTP success status and `"ok": true` in the body.
async fn check_api_response(response: reqwest::Response, method: &str) -> Result<()> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        anyhow::bail!("{method} failed: status={status} body={body}");
    }

    let api: ApiResponse = response
        .json()
        .await
        .with_context(|| format!("Failed to parse {method} response"))?;

    if !api.ok {
        anyhow::bail!(
            "{method} rejected by Telegram: {}",
            api.description.unwrap_or_else(|| "no description".to_string())
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> TelegramClient {
        TelegramClient::with_base_url(server.uri()).unwrap()
    }

    #[test]
    fn test_effective_message_prefers_message() {
        let update: Update = serde_json::from_value(json!({
            "message": {"chat": {"id": 1}, "text": "a"},
            "edited_message": {"chat": {"id": 2}, "text": "b"}
        }))
        .unwrap();
        assert_eq!(update.effective_message().unwrap().chat.id, 1);
    }

    #[test]
    fn test_effective_message_falls_back_to_edited() {
        let update: Update = serde_json::from_value(json!({
            "edited_message": {"chat": {"id": 7}, "text": "later"}
        }))
        .unwrap();
        assert_eq!(update.effective_message().unwrap().chat.id, 7);
        assert!(Update::default().effective_message().is_none());
    }

    #[tokio::test]
    async fn test_send_message_posts_json_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/sendMessage"))
            .and(body_json(json!({"chat_id": 42, "text": "hello"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server).send_message(42, "hello").await.unwrap();
    }

    #[tokio::test]
    async fn test_send_message_non_success_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/sendMessage"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
            .mount(&server)
            .await;

        let err = client_for(&server).send_message(1, "hi").await.unwrap_err();
        assert!(err.to_string().contains("401"));
    }

    #[tokio::test]
    async fn test_set_webhook_sends_form_encoded_url() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/setWebhook"))
            .and(body_string_contains("url="))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server)
            .set_webhook("https://bot.example.com/webhook/hook")
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        let body = String::from_utf8(requests[0].body.clone()).unwrap();
        assert_eq!(body, "url=https%3A%2F%2Fbot.example.com%2Fwebhook%2Fhook");
    }

    #[tokio::test]
    async fn test_set_webhook_platform_reported_failure_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/setWebhook"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": false,
                "description": "bad webhook: HTTPS url must be provided"
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .set_webhook("http://insecure.example.com/webhook/hook")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("bad webhook"));
    }
}
