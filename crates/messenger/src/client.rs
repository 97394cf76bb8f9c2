//! Graph API HTTP client.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::GraphConfig;
use crate::error::MessengerError;
use crate::types::{MessagePayload, SendRequest, SendResponse, SenderAction};

/// Graph API error envelope.
#[derive(Debug, Deserialize)]
struct GraphErrorBody {
    error: GraphError,
}

#[derive(Debug, Deserialize)]
struct GraphError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    code: i64,
}

/// Client for the Send API.
#[derive(Clone)]
pub struct MessengerClient {
    http: Client,
    config: GraphConfig,
}

impl MessengerClient {
    /// Create a client. Fails when no page access token is configured.
    pub fn new(config: GraphConfig) -> Result<Self, MessengerError> {
        if config.page_access_token.is_empty() {
            return Err(MessengerError::Config(
                "page access token is empty".to_string(),
            ));
        }

        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(MessengerError::Http)?;

        Ok(Self { http, config })
    }

    /// Send a message to a user.
    pub async fn send_message(
        &self,
        recipient_id: &str,
        message: MessagePayload,
    ) -> Result<SendResponse, MessengerError> {
        self.send(&SendRequest::message(recipient_id, message)).await
    }

    /// Send a sender action (typing indicator or read receipt).
    pub async fn send_sender_action(
        &self,
        recipient_id: &str,
        action: SenderAction,
    ) -> Result<(), MessengerError> {
        self.send(&SendRequest::action(recipient_id, action)).await?;
        Ok(())
    }

    /// Post a request to the Send API.
    pub async fn send(&self, request: &SendRequest) -> Result<SendResponse, MessengerError> {
        debug!(
            "Send API call to {} (action: {:?})",
            request.recipient.id, request.sender_action
        );

        let response = self
            .http
            .post(self.config.messages_url())
            .query(&[("access_token", self.config.page_access_token.as_str())])
            .json(request)
            .send()
            .await
            .map_err(MessengerError::Http)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Send API returned HTTP {}: {}", status, body);
            return Err(api_error(status.as_u16(), &body));
        }

        let body = response.text().await.map_err(MessengerError::Http)?;
        if body.trim().is_empty() {
            return Ok(SendResponse::default());
        }
        Ok(serde_json::from_str(&body)?)
    }

    /// Get the configuration.
    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// Get the underlying HTTP client.
    pub fn http_client(&self) -> &Client {
        &self.http
    }
}

/// Build an API error from a non-success response body, preferring the
/// Graph error envelope over the raw body.
fn api_error(status: u16, body: &str) -> MessengerError {
    match serde_json::from_str::<GraphErrorBody>(body) {
        Ok(parsed) => MessengerError::Api {
            code: parsed.error.code,
            message: parsed.error.message,
        },
        Err(_) => MessengerError::Api {
            code: i64::from(status),
            message: format!("HTTP {}: {}", status, body),
        },
    }
}

impl std::fmt::Debug for MessengerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessengerClient")
            .field("config", &self.config)
            .finish()
    }
}
