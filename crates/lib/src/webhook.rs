//! Webhook client: one JSON POST per message, one JSON reply per POST.
//!
//! Request body is `{"message": ..., "space": ...}` (space omitted when none is selected);
//! a successful reply is `{"output": ...}`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::{self, Config};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookRequest {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub space: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct WebhookReply {
    #[serde(default)]
    pub output: Option<String>,
}

impl WebhookReply {
    /// Reply text, if the webhook sent a non-empty one.
    pub fn text(&self) -> Option<&str> {
        self.output.as_deref().filter(|s| !s.is_empty())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("no webhook url configured (set webhook.url or OMNICHAT_WEBHOOK_URL)")]
    MissingUrl,
    #[error("building http client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("webhook request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("webhook returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("webhook reply is not valid JSON: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("request ended without a reply")]
    Interrupted,
}

impl WebhookError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, WebhookError::Request(e) if e.is_timeout())
    }
}

/// Anything that can answer a chat message. The HTTP client is the real one; tests plug in fakes.
#[async_trait]
pub trait Webhook: Send + Sync {
    async fn post(&self, request: &WebhookRequest) -> Result<WebhookReply, WebhookError>;
}

/// Client for the configured webhook endpoint.
#[derive(Clone)]
pub struct WebhookClient {
    url: String,
    client: reqwest::Client,
}

impl WebhookClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, WebhookError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(WebhookError::Client)?;
        Ok(Self {
            url: url.into(),
            client,
        })
    }

    /// Build from config, resolving env overrides for url and timeout.
    pub fn from_config(config: &Config) -> Result<Self, WebhookError> {
        let url = config::resolve_webhook_url(config).ok_or(WebhookError::MissingUrl)?;
        let timeout = config::resolve_timeout(config);
        log::debug!("webhook {} (timeout {:?})", url, timeout);
        Self::new(url, timeout)
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Webhook for WebhookClient {
    /// POST the message; non-2xx status and unparsable bodies are errors.
    async fn post(&self, request: &WebhookRequest) -> Result<WebhookReply, WebhookError> {
        let res = self.client.post(&self.url).json(request).send().await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(WebhookError::Status { status, body });
        }
        let bytes = res.bytes().await?;
        serde_json::from_slice(&bytes).map_err(WebhookError::Decode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_omits_space_when_none() {
        let req = WebhookRequest {
            message: "Hello".into(),
            space: None,
        };
        assert_eq!(serde_json::to_string(&req).unwrap(), r#"{"message":"Hello"}"#);
    }

    #[test]
    fn request_carries_space_when_selected() {
        let req = WebhookRequest {
            message: "Hello".into(),
            space: Some("INFRAD".into()),
        };
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            serde_json::json!({ "message": "Hello", "space": "INFRAD" })
        );
    }

    #[test]
    fn reply_text_treats_missing_and_empty_alike() {
        let missing: WebhookReply = serde_json::from_str("{}").unwrap();
        let empty: WebhookReply = serde_json::from_str(r#"{"output":""}"#).unwrap();
        let null: WebhookReply = serde_json::from_str(r#"{"output":null}"#).unwrap();
        let full: WebhookReply =
            serde_json::from_str(r#"{"output":"Hi there","extra":1}"#).unwrap();
        assert_eq!(missing.text(), None);
        assert_eq!(empty.text(), None);
        assert_eq!(null.text(), None);
        assert_eq!(full.text(), Some("Hi there"));
    }

    #[test]
    fn from_config_without_url_is_an_error() {
        if std::env::var("OMNICHAT_WEBHOOK_URL").is_ok() {
            return;
        }
        let err = WebhookClient::from_config(&Config::default()).err();
        assert!(matches!(err, Some(WebhookError::MissingUrl)));
    }

    #[test]
    fn from_config_trims_url() {
        if std::env::var("OMNICHAT_WEBHOOK_URL").is_ok() {
            return;
        }
        let mut config = Config::default();
        config.webhook.url = Some("  http://127.0.0.1:9/hook ".into());
        let client = WebhookClient::from_config(&config).unwrap();
        assert_eq!(client.url(), "http://127.0.0.1:9/hook");
    }
}
