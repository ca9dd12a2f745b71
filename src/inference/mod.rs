pub mod client;

pub use client::InferenceClient;

use crate::tools::ToolDefinition;
use crate::types::{ChatMessage, InferenceResponse};
use anyhow::Result;
use async_trait::async_trait;

/// A language model that can answer a conversation or request tool calls.
#[async_trait]
pub trait ModelRuntime: Send + Sync {
    /// Run one completion. `system` is sent ahead of `messages`.
    async fn chat(
        &self,
        system: &str,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<InferenceResponse>;
}
