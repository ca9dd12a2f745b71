//! System instructions for the two model calls.

use crate::tools::ToolRegistry;
use tracing::debug;

/// Instruction for the first call, ahead of the tool listing.
const ASSISTANT_IDENTITY: &str = "You are a helpful AI assistant with access to file tools. \
You can read and write files in the files directory. When a user asks to save something \
to a file or read from a file, use the appropriate tools.";

const CLOSING: &str = "Always be helpful and use tools when appropriate.";

/// Instruction for the follow-up call that turns tool output into an answer.
pub const FOLLOW_UP_INSTRUCTION: &str =
    "You are a helpful AI assistant. Provide a natural response based on the tool result.";

/// Build the system prompt for the first call.
///
/// The tool listing is rendered from the catalogue so the prose never drifts
/// from the schemas the model actually receives.
pub fn build_system_prompt(registry: &ToolRegistry) -> String {
    let mut prompt = String::with_capacity(512);
    prompt.push_str(ASSISTANT_IDENTITY);
    prompt.push_str("\n\nAvailable tools:\n");

    for def in registry.definitions() {
        // `required` keeps declaration order; `properties` is sorted by key.
        let params: Vec<&str> = def.parameters["required"]
            .as_array()
            .map(|names| names.iter().filter_map(|n| n.as_str()).collect())
            .unwrap_or_default();
        prompt.push_str(&format!(
            "- {}({}): {}\n",
            def.name,
            params.join(", "),
            def.description
        ));
    }

    prompt.push('\n');
    prompt.push_str(CLOSING);

    debug!("System prompt: {} chars", prompt.len());
    prompt
}
