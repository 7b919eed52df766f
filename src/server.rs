//! HTTP boundary: a JSON chat endpoint plus a health probe.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use crate::chat::ChatOrchestrator;
use crate::error::Error;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: String,
    /// Present only on the turn where the user picks a category in the form.
    #[serde(default)]
    pub category_id: Option<String>,
    /// Conversation identifier; omitted by single-user clients.
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub fn router(orchestrator: Arc<ChatOrchestrator>) -> Router {
    Router::new()
        .route("/chat", post(chat))
        .route("/health", get(health))
        .layer(CorsLayer::permissive())
        .with_state(orchestrator)
}

async fn chat(
    State(orchestrator): State<Arc<ChatOrchestrator>>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, (StatusCode, Json<ErrorResponse>)> {
    let session_id = request.session_id.as_deref().unwrap_or("default");
    info!(
        session = session_id,
        category = request.category_id.as_deref().unwrap_or("-"),
        "Chat message received"
    );

    match orchestrator
        .handle_message(session_id, &request.message, request.category_id.as_deref())
        .await
    {
        Ok(response) => Ok(Json(ChatResponse { response })),
        Err(err) => {
            error!(error = %err, session = session_id, "Chat turn failed");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: user_facing_error(&err),
                }),
            ))
        }
    }
}

/// Error text safe to return to the client.
fn user_facing_error(err: &Error) -> String {
    match err {
        Error::Catalog(inner) => inner.to_string(),
        _ => "Internal server error".to_string(),
    }
}

async fn health() -> &'static str {
    "ok"
}
