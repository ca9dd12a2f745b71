pub mod client;
pub mod events;

pub use client::SlackClient;
pub use events::{answerable, IncomingMessage, SlackEnvelope, SlackEvent, SlashCommand};

use anyhow::Result;
use async_trait::async_trait;

/// Delivers final answers to a chat channel.
#[async_trait]
pub trait ChannelRelay: Send + Sync {
    async fn send_message(&self, channel: &str, text: &str) -> Result<()>;
}
