//! WebSocket chat transport.
//!
//! Each connection is greeted with a freshly minted session id, then handled
//! as a loop of request messages; every request produces a chunk stream that
//! is forwarded verbatim as JSON text frames.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use serde_json::json;
use uuid::Uuid;

use crate::orchestrator::{generate_response, ChatQuery};
use crate::state::AppState;

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: Arc<AppState>) {
    let session_id = Uuid::new_v4().to_string();
    tracing::info!("WebSocket connected, session {}", session_id);

    let greeting = json!({ "type": "session", "content": session_id }).to_string();
    if socket.send(Message::Text(greeting)).await.is_err() {
        return;
    }

    while let Some(received) = socket.recv().await {
        let message = match received {
            Ok(message) => message,
            Err(err) => {
                tracing::debug!("WebSocket receive error for {}: {}", session_id, err);
                break;
            }
        };

        let text = match message {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };

        let request: ChatQuery = match serde_json::from_str(&text) {
            Ok(request) => request,
            Err(err) => {
                let error = json!({
                    "type": "error",
                    "content": format!("Invalid request: {}", err),
                    "last": true
                })
                .to_string();
                if socket.send(Message::Text(error)).await.is_err() {
                    return;
                }
                continue;
            }
        };

        // Clients may pin a session id to resume an earlier conversation;
        // otherwise the connection's own id scopes the memory.
        let request_session = request
            .session_id
            .clone()
            .unwrap_or_else(|| session_id.clone());

        let mut chunks = generate_response(state.clone(), request, request_session);
        while let Some(chunk) = chunks.recv().await {
            let payload = match serde_json::to_string(&chunk) {
                Ok(payload) => payload,
                Err(err) => {
                    tracing::error!("Failed to serialize chunk: {}", err);
                    continue;
                }
            };
            if socket.send(Message::Text(payload)).await.is_err() {
                tracing::info!("WebSocket disconnected mid-stream, session {}", session_id);
                return;
            }
        }
    }

    tracing::info!("WebSocket closed, session {}", session_id);
}
