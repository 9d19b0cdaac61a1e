use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;

use crate::state::AppState;

/// Clears the conversation memory for one session. Idempotent; clearing an
/// unknown session succeeds with nothing to do.
pub async fn clear_memory(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> StatusCode {
    state.memory.for_session(&session_id).clear().await;
    tracing::info!("Cleared conversation memory for session {}", session_id);
    StatusCode::NO_CONTENT
}
