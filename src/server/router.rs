use std::sync::Arc;

use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::handlers;
use super::ws;
use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/chat", post(handlers::chat::chat))
        .route("/ws/chat", get(ws::ws_handler))
        .route(
            "/api/institutions",
            get(handlers::institutions::list_institutions),
        )
        .route(
            "/api/sessions/:session_id/memory",
            delete(handlers::sessions::clear_memory),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
