//! The single conversational endpoint: one utterance in, one envelope
//! out. All routing policy lives in `urbanbot-router`; this layer only
//! validates the payload and tags the interaction for the logs.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::Json, routing::post, Router};
use serde::{Deserialize, Serialize};
use tracing::info;
use urbanbot_core::Envelope;
use urbanbot_router::Dispatcher;
use uuid::Uuid;

#[derive(Clone)]
pub struct ChatState {
    dispatcher: Arc<Dispatcher>,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ChatError {
    pub error: String,
}

pub fn router(dispatcher: Arc<Dispatcher>) -> Router {
    Router::new().route("/chat", post(chat)).with_state(ChatState { dispatcher })
}

pub async fn chat(
    State(state): State<ChatState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<Envelope>, (StatusCode, Json<ChatError>)> {
    let message = request.message.trim();
    if message.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ChatError { error: "message must not be empty".to_string() }),
        ));
    }

    let correlation_id = Uuid::new_v4();
    info!(
        event_name = "chat.message_received",
        correlation_id = %correlation_id,
        chars = message.len(),
        "routing chat message"
    );

    let envelope = state.dispatcher.route(message).await;

    info!(
        event_name = "chat.message_routed",
        correlation_id = %correlation_id,
        kind = if envelope.is_image() { "image" } else { "text" },
        "chat message routed"
    );

    Ok(Json(envelope))
}
