//! Configuration schema for relay.toml.

use serde::{Deserialize, Serialize};

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Address the webhook server binds to.
    pub host: String,

    /// Port the webhook server listens on.
    pub port: u16,

    /// Slack bot token (`xoxb-...`) used to post replies.
    pub slack_bot_token: String,

    /// Slack signing secret used to authenticate inbound requests.
    pub slack_signing_secret: String,

    /// Bot user id; messages mentioning `<@id>` are answered.
    pub slack_bot_user_id: String,

    /// Slack Web API base URL.
    pub slack_api_url: String,

    /// Only answer messages that mention the bot.
    pub require_mention: bool,

    /// OpenAI-compatible API base URL.
    pub model_api_url: String,

    /// API key for the model endpoint.
    pub model_api_key: String,

    /// Chat model name.
    pub model: String,

    /// Maximum completion tokens per model call.
    pub max_tokens: u32,

    pub temperature: f64,

    /// Upper bound on a single model call, in seconds.
    pub model_timeout_secs: u64,

    /// Storage root for the file tools.
    pub files_dir: String,

    /// Log level (debug, info, warn, error).
    pub log_level: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 3000,
            slack_bot_token: String::new(),
            slack_signing_secret: String::new(),
            slack_bot_user_id: String::new(),
            slack_api_url: "https://slack.com".into(),
            require_mention: true,
            model_api_url: "https://api.openai.com".into(),
            model_api_key: String::new(),
            model: "gpt-3.5-turbo".into(),
            max_tokens: 1024,
            temperature: 0.7,
            model_timeout_secs: 60,
            files_dir: "./files".into(),
            log_level: "info".into(),
        }
    }
}

impl RelayConfig {
    /// Resolve a path that may contain `~` to an absolute path.
    pub fn resolve_path(&self, path: &str) -> String {
        shellexpand::tilde(path).into_owned()
    }

    /// Resolved storage root for the file tools.
    pub fn resolved_files_dir(&self) -> String {
        self.resolve_path(&self.files_dir)
    }

    /// Signing secret, or `None` when unset.
    pub fn signing_secret(&self) -> Option<&str> {
        Some(self.slack_signing_secret.as_str()).filter(|s| !s.is_empty())
    }

    /// Environment variable names of required settings that are empty.
    pub fn missing_required(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.slack_bot_token.is_empty() {
            missing.push(super::ENV_BOT_TOKEN);
        }
        if self.slack_signing_secret.is_empty() {
            missing.push(super::ENV_SIGNING_SECRET);
        }
        if self.model_api_key.is_empty() {
            missing.push(super::ENV_API_KEY);
        }
        missing
    }
}
