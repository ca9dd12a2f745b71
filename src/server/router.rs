use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use super::handlers::{handle_health, handle_slack_command, handle_slack_event};
use super::AppState;

/// Build the webhook router.
pub fn build(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handle_health))
        .route("/slack/events", post(handle_slack_event))
        .route("/slack/commands", post(handle_slack_command))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
