//! Client for the hosted-model chat relay.
//!
//! The relay owns prompt assembly and model access; this client sends one
//! user message and gets the assistant's reply back, together with the id of
//! the conversation the relay attached it to. Throttling (429) and billing
//! refusals (402) are mapped to their own error variants so callers surface
//! them instead of retrying.

use serde::Deserialize;

use crate::error::{Error, Result};

/// Reply from the chat relay.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatReply {
    pub response: String,
    #[serde(rename = "conversationId")]
    pub conversation_id: String,
}

pub struct ChatRelayClient {
    base_url: String,
    bearer: String,
    client: reqwest::Client,
}

impl ChatRelayClient {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        bearer: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            bearer: bearer.into(),
            client,
        }
    }

    /// Send one user message. Without a conversation id the relay opens a
    /// new conversation and returns its id.
    pub async fn invoke(&self, message: &str, conversation_id: Option<&str>) -> Result<ChatReply> {
        let url = format!(
            "{}/functions/v1/chat",
            self.base_url.trim_end_matches('/')
        );
        let body = serde_json::json!({
            "message": message,
            "conversationId": conversation_id,
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.bearer)
            .json(&body)
            .send()
            .await?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(match status {
                402 => Error::QuotaExhausted(message),
                429 => Error::RateLimited(message),
                _ => Error::Api { status, message },
            });
        }

        let reply = response.json().await?;
        Ok(reply)
    }
}
