//! Tool-augmented response loop: Ask → Act → Answer.
//!
//! For each inbound message the orchestrator:
//! 1. Calls the model with the system prompt and the tool catalogue
//! 2. Returns the text directly if no tools were requested
//! 3. Otherwise executes every requested tool in order
//! 4. Makes one follow-up call carrying all tool results
//!
//! Errors never leave `process_message`; the user always gets some text.

use crate::agent::{context, system_prompt};
use crate::inference::ModelRuntime;
use crate::tools::{ToolDefinition, ToolExecutor, ToolRegistry};
use crate::types::*;
use anyhow::{anyhow, Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

/// Returned when the model answers with no text and no tool calls.
pub const NO_RESPONSE_REPLY: &str = "I apologize, but I could not generate a response.";

/// Returned when the follow-up call produces no text.
pub const TOOL_DONE_REPLY: &str = "Tool executed successfully.";

/// Returned when the model runtime fails at either call site.
pub const ERROR_REPLY: &str =
    "I apologize, but I encountered an error while processing your request.";

/// Default upper bound on a single model call.
pub const DEFAULT_MODEL_TIMEOUT: Duration = Duration::from_secs(60);

/// Drives one user message through the model and the tools.
#[derive(Clone)]
pub struct ResponseOrchestrator {
    model: Arc<dyn ModelRuntime>,
    registry: Arc<ToolRegistry>,
    executor: ToolExecutor,
    system_prompt: String,
    model_timeout: Duration,
}

impl ResponseOrchestrator {
    pub fn new(
        model: Arc<dyn ModelRuntime>,
        registry: Arc<ToolRegistry>,
        executor: ToolExecutor,
    ) -> Self {
        let system_prompt = system_prompt::build_system_prompt(&registry);
        Self {
            model,
            registry,
            executor,
            system_prompt,
            model_timeout: DEFAULT_MODEL_TIMEOUT,
        }
    }

    pub fn with_model_timeout(mut self, timeout: Duration) -> Self {
        self.model_timeout = timeout;
        self
    }

    /// Produce exactly one answer for `message`.
    pub async fn process_message(&self, message: &str) -> String {
        match self.respond(message).await {
            Ok(answer) => answer,
            Err(e) => {
                error!("Error processing message: {:#}", e);
                ERROR_REPLY.to_string()
            }
        }
    }

    async fn respond(&self, message: &str) -> Result<String> {
        let conversation = [ChatMessage::user(message)];
        let response = self
            .call_model(&self.system_prompt, &conversation, true)
            .await
            .context("Initial model call failed")?;

        if response.tool_calls.is_empty() {
            debug!("Model answered directly");
            return Ok(response
                .text()
                .map(str::to_string)
                .unwrap_or_else(|| NO_RESPONSE_REPLY.to_string()));
        }

        let calls = context::normalize_call_ids(response.tool_calls);
        info!("Model requested {} tool call(s)", calls.len());

        let mut results = Vec::with_capacity(calls.len());
        for call in &calls {
            results.push(self.executor.execute(call).await);
        }

        let follow_up = context::build_follow_up(message, response.content, &calls, &results)?;
        let answer = self
            .call_model(system_prompt::FOLLOW_UP_INSTRUCTION, &follow_up, false)
            .await
            .context("Follow-up model call failed")?;

        if !answer.tool_calls.is_empty() {
            debug!(
                "Ignoring {} tool call(s) requested in the follow-up",
                answer.tool_calls.len()
            );
        }

        Ok(answer
            .text()
            .map(str::to_string)
            .unwrap_or_else(|| TOOL_DONE_REPLY.to_string()))
    }

    async fn call_model(
        &self,
        system: &str,
        messages: &[ChatMessage],
        with_tools: bool,
    ) -> Result<InferenceResponse> {
        let tools: &[ToolDefinition] = if with_tools {
            self.registry.definitions()
        } else {
            &[]
        };

        let response = tokio::time::timeout(
            self.model_timeout,
            self.model.chat(system, messages, tools),
        )
        .await
        .map_err(|_| anyhow!("Model call timed out after {:?}", self.model_timeout))??;

        debug!(
            "Model usage: {} prompt / {} completion tokens",
            response.usage.prompt_tokens, response.usage.completion_tokens
        );
        Ok(response)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::tools::tests::MemoryStorage;
    use crate::tools::Storage;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// A recorded model call.
    #[derive(Debug, Clone)]
    pub(crate) struct RecordedCall {
        pub system: String,
        pub messages: Vec<ChatMessage>,
        pub tool_names: Vec<String>,
    }

    /// Model that replays scripted responses and records what it was sent.
    #[derive(Default)]
    pub(crate) struct ScriptedModel {
        pub responses: Mutex<VecDeque<Result<InferenceResponse>>>,
        pub calls: Mutex<Vec<RecordedCall>>,
    }

    impl ScriptedModel {
        pub fn new(responses: Vec<Result<InferenceResponse>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn recorded(&self) -> Vec<RecordedCall> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ModelRuntime for ScriptedModel {
        async fn chat(
            &self,
            system: &str,
            messages: &[ChatMessage],
            tools: &[ToolDefinition],
        ) -> Result<InferenceResponse> {
            self.calls.lock().unwrap().push(RecordedCall {
                system: system.to_string(),
                messages: messages.to_vec(),
                tool_names: tools.iter().map(|t| t.name.clone()).collect(),
            });
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(anyhow!("no scripted response left")))
        }
    }

    /// Model that never answers.
    struct HangingModel;

    #[async_trait]
    impl ModelRuntime for HangingModel {
        async fn chat(
            &self,
            _system: &str,
            _messages: &[ChatMessage],
            _tools: &[ToolDefinition],
        ) -> Result<InferenceResponse> {
            std::future::pending().await
        }
    }

    pub(crate) fn text(content: &str) -> Result<InferenceResponse> {
        Ok(InferenceResponse {
            content: Some(content.into()),
            ..Default::default()
        })
    }

    pub(crate) fn tool_calls(calls: Vec<(&str, &str, serde_json::Value)>) -> Result<InferenceResponse> {
        Ok(InferenceResponse {
            content: None,
            tool_calls: calls
                .into_iter()
                .map(|(id, name, arguments)| ToolCall {
                    id: id.into(),
                    name: name.into(),
                    arguments,
                })
                .collect(),
            usage: TokenUsage::default(),
        })
    }

    pub(crate) fn orchestrator(
        model: Arc<dyn ModelRuntime>,
        storage: Arc<dyn Storage>,
    ) -> ResponseOrchestrator {
        ResponseOrchestrator::new(
            model,
            Arc::new(ToolRegistry::builtin()),
            ToolExecutor::new(storage),
        )
    }

    #[tokio::test]
    async fn test_direct_answer_is_returned_verbatim() {
        let model = Arc::new(ScriptedModel::new(vec![text("Hi there!")]));
        let orch = orchestrator(model.clone(), Arc::new(MemoryStorage::default()));

        assert_eq!(orch.process_message("hello").await, "Hi there!");

        let calls = model.recorded();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].system.contains("Available tools"));
        assert_eq!(calls[0].tool_names, vec!["read_file", "write_file"]);
        assert_eq!(calls[0].messages[0].content.as_deref(), Some("hello"));
    }

    #[tokio::test]
    async fn test_empty_answer_uses_fallback() {
        let model = Arc::new(ScriptedModel::new(vec![Ok(InferenceResponse::default())]));
        let orch = orchestrator(model, Arc::new(MemoryStorage::default()));
        assert_eq!(orch.process_message("hello").await, NO_RESPONSE_REPLY);
    }

    #[tokio::test]
    async fn test_read_file_result_reaches_follow_up() {
        let model = Arc::new(ScriptedModel::new(vec![
            tool_calls(vec![("call_1", "read_file", json!({"filename": "notes.txt"}))]),
            text("The file says abc."),
        ]));
        let orch = orchestrator(model.clone(), Arc::new(MemoryStorage::with_file("notes.txt", "abc")));

        assert_eq!(orch.process_message("what's in notes?").await, "The file says abc.");

        let calls = model.recorded();
        assert_eq!(calls.len(), 2);
        let follow_up = &calls[1];
        assert_eq!(follow_up.system, system_prompt::FOLLOW_UP_INSTRUCTION);
        assert!(follow_up.tool_names.is_empty());
        assert_eq!(follow_up.messages.len(), 3);
        assert_eq!(follow_up.messages[0].content.as_deref(), Some("what's in notes?"));
        assert_eq!(follow_up.messages[1].tool_calls[0].id, "call_1");

        let tool_msg = &follow_up.messages[2];
        assert_eq!(tool_msg.role, ChatRole::Tool);
        assert_eq!(tool_msg.tool_call_id.as_deref(), Some("call_1"));
        let payload: serde_json::Value =
            serde_json::from_str(tool_msg.content.as_deref().unwrap()).unwrap();
        assert_eq!(payload, json!({"success": true, "content": "abc"}));
    }

    #[tokio::test]
    async fn test_failed_write_still_answers() {
        let model = Arc::new(ScriptedModel::new(vec![
            tool_calls(vec![(
                "call_w",
                "write_file",
                json!({"filename": "out.txt", "content": "hi"}),
            )]),
            Ok(InferenceResponse::default()),
        ]));
        let orch = orchestrator(model.clone(), Arc::new(MemoryStorage::failing_writes("disk full")));

        assert_eq!(orch.process_message("save hi").await, TOOL_DONE_REPLY);

        let tool_msg = &model.recorded()[1].messages[2];
        let payload: serde_json::Value =
            serde_json::from_str(tool_msg.content.as_deref().unwrap()).unwrap();
        assert_eq!(payload["success"], false);
        assert_eq!(payload["error"], "Failed to write file out.txt: disk full");
    }

    #[tokio::test]
    async fn test_all_tool_results_fold_into_one_follow_up() {
        let storage = Arc::new(MemoryStorage::with_file("a.txt", "A"));
        let model = Arc::new(ScriptedModel::new(vec![
            tool_calls(vec![
                ("c1", "read_file", json!({"filename": "a.txt"})),
                ("c2", "write_file", json!({"filename": "b.txt", "content": "B"})),
                ("c3", "delete_file", json!({"filename": "a.txt"})),
            ]),
            text("Done with all three."),
        ]));
        let orch = orchestrator(model.clone(), storage.clone());

        assert_eq!(orch.process_message("do things").await, "Done with all three.");

        let calls = model.recorded();
        assert_eq!(calls.len(), 2);
        let ids: Vec<_> = calls[1].messages[2..]
            .iter()
            .map(|m| m.tool_call_id.clone().unwrap())
            .collect();
        assert_eq!(ids, vec!["c1", "c2", "c3"]);
        assert!(calls[1].messages[4]
            .content
            .as_deref()
            .unwrap()
            .contains("Unknown tool: delete_file"));
        assert_eq!(storage.files.lock().unwrap().get("b.txt").unwrap(), "B");
    }

    #[tokio::test]
    async fn test_model_error_on_first_call() {
        let model = Arc::new(ScriptedModel::new(vec![Err(anyhow!("401 invalid api key"))]));
        let orch = orchestrator(model, Arc::new(MemoryStorage::default()));
        let answer = orch.process_message("hello").await;
        assert_eq!(answer, ERROR_REPLY);
        assert!(!answer.contains("401"));
    }

    #[tokio::test]
    async fn test_model_error_on_follow_up() {
        let model = Arc::new(ScriptedModel::new(vec![
            tool_calls(vec![("c1", "read_file", json!({"filename": "x"}))]),
            Err(anyhow!("connection reset")),
        ]));
        let orch = orchestrator(model, Arc::new(MemoryStorage::default()));
        assert_eq!(orch.process_message("read x").await, ERROR_REPLY);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_model_times_out() {
        let orch = orchestrator(Arc::new(HangingModel), Arc::new(MemoryStorage::default()))
            .with_model_timeout(Duration::from_secs(5));
        assert_eq!(orch.process_message("hello").await, ERROR_REPLY);
    }
}
