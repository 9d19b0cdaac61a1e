//! Non-streaming chat endpoint. Runs the same orchestration as the WebSocket
//! transport but collects the whole chunk stream into one response body, error
//! chunks included.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;
use uuid::Uuid;

use crate::core::errors::ApiError;
use crate::orchestrator::{generate_response, ChatQuery, ResponseChunk};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub session_id: String,
    pub responses: Vec<ResponseChunk>,
}

pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatQuery>,
) -> Result<Json<ChatResponse>, ApiError> {
    if request.query.trim().is_empty() {
        return Err(ApiError::BadRequest("No query provided".to_string()));
    }

    let session_id = request
        .session_id
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let mut chunks = generate_response(state, request, session_id.clone());
    let mut responses = Vec::new();
    while let Some(chunk) = chunks.recv().await {
        responses.push(chunk);
    }

    Ok(Json(ChatResponse {
        session_id,
        responses,
    }))
}
