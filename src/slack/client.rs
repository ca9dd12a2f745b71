//! Slack Web API client used to post answers back to channels.

use super::ChannelRelay;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

/// Slack Web API client.
#[derive(Debug, Clone)]
pub struct SlackClient {
    api_url: String,
    bot_token: String,
    http: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct PostMessageRequest<'a> {
    channel: &'a str,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct PostMessageResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

impl SlackClient {
    pub fn new(api_url: &str, bot_token: &str) -> Self {
        Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            bot_token: bot_token.to_string(),
            http: reqwest::Client::new(),
        }
    }

    /// Post `text` to `channel` via `chat.postMessage`.
    pub async fn post_message(&self, channel: &str, text: &str) -> Result<()> {
        let resp = self
            .http
            .post(format!("{}/api/chat.postMessage", self.api_url))
            .bearer_auth(&self.bot_token)
            .json(&PostMessageRequest { channel, text })
            .send()
            .await
            .context("Slack chat.postMessage request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            bail!("Slack chat.postMessage failed ({}): {}", status, body);
        }

        // Slack reports most failures as 200 with `ok: false`.
        let body: PostMessageResponse = resp
            .json()
            .await
            .context("Failed to parse chat.postMessage response")?;
        if !body.ok {
            bail!(
                "Slack chat.postMessage rejected: {}",
                body.error.unwrap_or_else(|| "unknown error".into())
            );
        }

        debug!("Posted {} chars to {}", text.len(), channel);
        Ok(())
    }
}

#[async_trait]
impl ChannelRelay for SlackClient {
    async fn send_message(&self, channel: &str, text: &str) -> Result<()> {
        self.post_message(channel, text).await.map_err(|e| {
            error!("Error sending message: {:#}", e);
            e.context("Failed to send message to Slack")
        })
    }
}
