use axum::body::Bytes;
use axum::extract::{FromRequest, Request, State};
use axum::http::HeaderMap;
use axum::Form;
use axum::Json;
use serde_json::{json, Value};
use tracing::{debug, error, info, info_span, warn, Instrument};

use super::error::ApiError;
use super::AppState;
use crate::slack::{self, IncomingMessage, SlackEnvelope, SlashCommand};

pub const SIGNATURE_HEADER: &str = "x-slack-signature";
pub const TIMESTAMP_HEADER: &str = "x-slack-request-timestamp";

/// Posted to the channel when the answer itself could not be delivered.
pub const DELIVERY_FAILED_REPLY: &str = "Sorry, I encountered an error processing your request.";

const EMPTY_COMMAND_REPLY: &str = "Please provide a message for me to process!";

/// Largest slash-command body we buffer for verification.
const MAX_COMMAND_BODY: usize = 64 * 1024;

pub async fn handle_health() -> Json<Value> {
    Json(json!({"status": "ok", "timestamp": chrono::Utc::now().to_rfc3339()}))
}

pub async fn handle_slack_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    authenticate(&state, &headers, &body)?;

    let envelope: SlackEnvelope = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("invalid event payload: {e}")))?;

    match envelope {
        SlackEnvelope::UrlVerification { challenge } => {
            info!("Answering URL verification challenge");
            Ok(Json(json!({ "challenge": challenge })))
        }
        SlackEnvelope::EventCallback { event: Some(event) } => {
            match slack::answerable(&event, &state.bot_user_id, state.require_mention) {
                Ok(message) => {
                    let request_id = ulid::Ulid::new().to_string();
                    let span = info_span!("slack_event", %request_id, channel = %message.channel);
                    // Slack expects an ack within three seconds; answer in the background.
                    state
                        .tasks
                        .spawn(relay_answer(state.clone(), message).instrument(span));
                }
                Err(reason) => debug!("Ignoring event: {:?}", reason),
            }
            Ok(Json(json!({ "ok": true })))
        }
        SlackEnvelope::EventCallback { event: None } | SlackEnvelope::Other => {
            Ok(Json(json!({ "ok": true })))
        }
    }
}

pub async fn handle_slack_command(
    State(state): State<AppState>,
    request: Request,
) -> Result<Json<Value>, ApiError> {
    let (parts, body) = request.into_parts();
    let bytes = axum::body::to_bytes(body, MAX_COMMAND_BODY)
        .await
        .map_err(|e| ApiError::BadRequest(format!("unreadable body: {e}")))?;
    authenticate(&state, &parts.headers, &bytes)?;

    let request = Request::from_parts(parts, bytes.into());
    let Form(command) = Form::<SlashCommand>::from_request(request, &state)
        .await
        .map_err(|e| ApiError::BadRequest(e.body_text()))?;

    if command.text.trim().is_empty() {
        return Ok(Json(json!({
            "response_type": "ephemeral",
            "text": EMPTY_COMMAND_REPLY,
        })));
    }

    info!(
        "Slash command from {} in {}",
        command.user_name.as_deref().unwrap_or("unknown"),
        command.channel_id.as_deref().unwrap_or("unknown"),
    );
    let answer = state.orchestrator.process_message(&command.text).await;

    Ok(Json(json!({
        "response_type": "in_channel",
        "text": answer,
    })))
}

/// Check the Slack signature headers against the raw body.
fn authenticate(state: &AppState, headers: &HeaderMap, body: &[u8]) -> Result<(), ApiError> {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

    let (Some(signature), Some(timestamp)) = (header(SIGNATURE_HEADER), header(TIMESTAMP_HEADER))
    else {
        warn!("Request missing Slack signature headers");
        return Err(ApiError::Unauthorized);
    };
    let Ok(timestamp) = timestamp.trim().parse::<i64>() else {
        warn!("Request timestamp is not an integer");
        return Err(ApiError::Unauthorized);
    };

    if state.authenticator.verify(signature, timestamp, body) {
        Ok(())
    } else {
        Err(ApiError::Unauthorized)
    }
}

/// Answer a message and post the result to its channel.
async fn relay_answer(state: AppState, message: IncomingMessage) {
    let answer = state.orchestrator.process_message(&message.text).await;

    if let Err(e) = state.relay.send_message(&message.channel, &answer).await {
        error!("Error delivering answer: {:#}", e);
        if let Err(e) = state
            .relay
            .send_message(&message.channel, DELIVERY_FAILED_REPLY)
            .await
        {
            error!("Error delivering failure notice: {:#}", e);
        }
    }
}
