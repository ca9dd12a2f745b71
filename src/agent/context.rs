//! Conversation assembly for the follow-up model call.

use crate::types::*;
use anyhow::{bail, Result};

/// Give every tool call a usable, unique id.
///
/// Tool messages are matched to calls by id, so calls that arrive without
/// one (or with a repeated one) get a positional id before execution.
pub fn normalize_call_ids(calls: Vec<ToolCall>) -> Vec<ToolCall> {
    let mut seen = std::collections::HashSet::new();
    calls
        .into_iter()
        .enumerate()
        .map(|(i, mut call)| {
            if call.id.is_empty() || seen.contains(&call.id) {
                call.id = (i..)
                    .map(|n| format!("call_{}", n))
                    .find(|id| !seen.contains(id))
                    .unwrap_or_default();
            }
            seen.insert(call.id.clone());
            call
        })
        .collect()
}

/// Build the follow-up conversation: the user message, the assistant turn
/// that requested `calls`, then one tool message per call in request order.
pub fn build_follow_up(
    user_message: &str,
    assistant_content: Option<String>,
    calls: &[ToolCall],
    results: &[ToolResult],
) -> Result<Vec<ChatMessage>> {
    if calls.len() != results.len() {
        bail!(
            "Tool result count ({}) does not match requested calls ({})",
            results.len(),
            calls.len()
        );
    }

    let mut messages = Vec::with_capacity(calls.len() + 2);
    messages.push(ChatMessage::user(user_message));
    messages.push(ChatMessage::assistant_tool_calls(
        assistant_content,
        calls.to_vec(),
    ));
    for (call, result) in calls.iter().zip(results) {
        messages.push(ChatMessage::tool_result(
            call.id.clone(),
            result.to_model_payload(),
        ));
    }

    Ok(messages)
}
