pub mod schema;

pub use schema::RelayConfig;

use anyhow::{Context, Result};
use std::path::Path;
use tracing::debug;

pub const ENV_BOT_TOKEN: &str = "SLACK_BOT_TOKEN";
pub const ENV_SIGNING_SECRET: &str = "SLACK_SIGNING_SECRET";
pub const ENV_BOT_USER_ID: &str = "SLACK_BOT_USER_ID";
pub const ENV_API_KEY: &str = "OPENAI_API_KEY";
pub const ENV_API_URL: &str = "OPENAI_BASE_URL";
pub const ENV_MODEL: &str = "OPENAI_MODEL";
pub const ENV_PORT: &str = "PORT";
pub const ENV_FILES_DIR: &str = "FILES_DIR";

/// Load config from the given path (or defaults), then apply the process
/// environment on top.
pub fn load_config(path: Option<&Path>) -> Result<RelayConfig> {
    let mut config = match path {
        Some(path) if path.exists() => {
            let contents =
                std::fs::read_to_string(path).context("Failed to read relay config file")?;
            toml::from_str(&contents).context("Failed to parse relay config (TOML)")?
        }
        Some(path) => {
            debug!("No config file at {}, using defaults", path.display());
            RelayConfig::default()
        }
        None => RelayConfig::default(),
    };

    apply_env(&mut config, |key| std::env::var(key).ok())?;
    Ok(config)
}

/// Overlay environment values onto `config`. Empty values are ignored.
pub fn apply_env<F>(config: &mut RelayConfig, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(v) = get(ENV_BOT_TOKEN) {
        config.slack_bot_token = v;
    }
    if let Some(v) = get(ENV_SIGNING_SECRET) {
        config.slack_signing_secret = v;
    }
    if let Some(v) = get(ENV_BOT_USER_ID) {
        config.slack_bot_user_id = v;
    }
    if let Some(v) = get(ENV_API_KEY) {
        config.model_api_key = v;
    }
    if let Some(v) = get(ENV_API_URL) {
        config.model_api_url = v;
    }
    if let Some(v) = get(ENV_MODEL) {
        config.model = v;
    }
    if let Some(v) = get(ENV_PORT) {
        config.port = v
            .trim()
            .parse()
            .with_context(|| format!("Invalid {ENV_PORT} value: {v}"))?;
    }
    if let Some(v) = get(ENV_FILES_DIR) {
        config.files_dir = v;
    }
    Ok(())
}
