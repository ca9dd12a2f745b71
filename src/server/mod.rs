//! Webhook HTTP server.

pub mod error;
pub mod handlers;
pub mod router;

use crate::agent::ResponseOrchestrator;
use crate::auth::RequestAuthenticator;
use crate::config::RelayConfig;
use crate::inference::InferenceClient;
use crate::slack::{ChannelRelay, SlackClient};
use crate::tools::{FsStorage, ToolExecutor, ToolRegistry};
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::info;

/// Shared handles for every request. Nothing in here is mutated per request.
#[derive(Clone)]
pub struct AppState {
    pub authenticator: Arc<RequestAuthenticator>,
    pub orchestrator: Arc<ResponseOrchestrator>,
    pub relay: Arc<dyn ChannelRelay>,
    pub bot_user_id: Arc<str>,
    pub require_mention: bool,
    /// Background answers still running after their event was acked.
    pub tasks: TaskTracker,
}

impl AppState {
    /// Construct the production clients from configuration.
    pub fn from_config(config: &RelayConfig) -> Self {
        let registry = Arc::new(ToolRegistry::builtin());
        let storage = Arc::new(FsStorage::new(config.resolved_files_dir()));
        let model = InferenceClient::new(&config.model_api_url, &config.model_api_key, &config.model)
            .with_sampling(config.max_tokens, config.temperature);

        let orchestrator = ResponseOrchestrator::new(
            Arc::new(model),
            registry,
            ToolExecutor::new(storage),
        )
        .with_model_timeout(Duration::from_secs(config.model_timeout_secs));

        Self {
            authenticator: Arc::new(RequestAuthenticator::new(
                config.signing_secret().map(str::to_string),
            )),
            orchestrator: Arc::new(orchestrator),
            relay: Arc::new(SlackClient::new(
                &config.slack_api_url,
                &config.slack_bot_token,
            )),
            bot_user_id: config.slack_bot_user_id.as_str().into(),
            require_mention: config.require_mention,
            tasks: TaskTracker::new(),
        }
    }
}

/// Bind and serve until `cancel` fires.
pub async fn serve(config: &RelayConfig, state: AppState, cancel: CancellationToken) -> Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    serve_on(listener, state, cancel).await
}

/// Serve on an already bound listener. After `cancel` fires, open
/// connections drain and then every background answer runs to completion.
pub async fn serve_on(
    listener: tokio::net::TcpListener,
    state: AppState,
    cancel: CancellationToken,
) -> Result<()> {
    info!("Slack relay listening on {}", listener.local_addr()?);
    let tasks = state.tasks.clone();

    axum::serve(listener, router::build(state))
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
        .context("Server error")?;

    tasks.close();
    if !tasks.is_empty() {
        info!("Waiting for {} in-flight answers", tasks.len());
    }
    tasks.wait().await;

    info!("Server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::orchestrator::tests::orchestrator;
    use crate::auth;
    use crate::inference::ModelRuntime;
    use crate::server::handlers::{SIGNATURE_HEADER, TIMESTAMP_HEADER};
    use crate::tools::tests::MemoryStorage;
    use crate::tools::ToolDefinition;
    use crate::types::{ChatMessage, InferenceResponse};
    use async_trait::async_trait;
    use tokio::sync::mpsc;

    const SECRET: &str = "test-signing-secret";

    /// Model that takes a while before answering.
    struct SlowModel(Duration);

    #[async_trait]
    impl ModelRuntime for SlowModel {
        async fn chat(
            &self,
            _system: &str,
            _messages: &[ChatMessage],
            _tools: &[ToolDefinition],
        ) -> Result<InferenceResponse> {
            tokio::time::sleep(self.0).await;
            Ok(InferenceResponse {
                content: Some("late answer".into()),
                ..Default::default()
            })
        }
    }

    struct ChannelSink(mpsc::UnboundedSender<(String, String)>);

    #[async_trait]
    impl ChannelRelay for ChannelSink {
        async fn send_message(&self, channel: &str, text: &str) -> Result<()> {
            let _ = self.0.send((channel.to_string(), text.to_string()));
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_shutdown_waits_for_background_answers() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let model = Arc::new(SlowModel(Duration::from_millis(500)));
        let state = AppState {
            authenticator: Arc::new(RequestAuthenticator::new(Some(SECRET.into()))),
            orchestrator: Arc::new(orchestrator(model, Arc::new(MemoryStorage::default()))),
            relay: Arc::new(ChannelSink(tx)),
            bot_user_id: "UBOT".into(),
            require_mention: true,
            tasks: TaskTracker::new(),
        };

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(serve_on(listener, state, cancel.clone()));

        let body = serde_json::json!({
            "type": "event_callback",
            "event": {"type": "message", "channel": "C1", "user": "U1", "text": "<@UBOT> hi"}
        })
        .to_string();
        let ts = chrono::Utc::now().timestamp();
        let resp = reqwest::Client::new()
            .post(format!("http://{addr}/slack/events"))
            .header("content-type", "application/json")
            .header(SIGNATURE_HEADER, auth::sign(SECRET, ts, body.as_bytes()).unwrap())
            .header(TIMESTAMP_HEADER, ts.to_string())
            .body(body)
            .send()
            .await
            .unwrap();
        assert!(resp.status().is_success());
        drop(resp);

        // The event is acked; its answer is still waiting on the model.
        cancel.cancel();
        assert!(rx.try_recv().is_err());

        let result = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_ok());
        assert_eq!(
            rx.try_recv().unwrap(),
            ("C1".to_string(), "late answer".to_string())
        );
    }

    #[tokio::test]
    async fn test_serve_stops_on_cancel() {
        let config = RelayConfig {
            host: "127.0.0.1".into(),
            port: 0,
            ..Default::default()
        };
        let state = AppState::from_config(&config);
        let cancel = CancellationToken::new();
        let handle = tokio::spawn({
            let cancel = cancel.clone();
            async move { serve(&config, state, cancel).await }
        });

        cancel.cancel();
        let result = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_ok());
    }

    #[test]
    fn test_state_without_secret_rejects_everything() {
        let state = AppState::from_config(&RelayConfig::default());
        assert!(!state.authenticator.verify("v0=00", chrono::Utc::now().timestamp(), b"{}"));
        assert!(state.require_mention);
    }
}
