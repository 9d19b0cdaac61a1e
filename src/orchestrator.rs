//! Request orchestration: routes a chat query through intent checks, the
//! answer cache, retrieval, prompt assembly and streamed generation, then
//! writes the completed answer back to the cache and conversation memory.
//!
//! Responses flow to the transport as a chunk stream. Every terminal chunk
//! carries `last: true`; error chunks are terminal by definition. Write-back
//! happens only after the final chunk was delivered, so an abandoned stream
//! (client disconnect) leaves no partial answer behind.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;

use crate::prompt;
use crate::references::{extract_references, format_references_block};
use crate::state::AppState;

/// An incoming chat request, shared by the WebSocket and HTTP transports.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatQuery {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub personal_info: Option<BTreeMap<String, Value>>,
    #[serde(default)]
    pub institution_id: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkKind {
    Response,
    Error,
}

/// One streamed unit of the response.
#[derive(Debug, Clone, Serialize)]
pub struct ResponseChunk {
    #[serde(rename = "type")]
    pub kind: ChunkKind,
    pub content: String,
    pub last: bool,
}

impl ResponseChunk {
    fn partial(content: String) -> Self {
        Self {
            kind: ChunkKind::Response,
            content,
            last: false,
        }
    }

    fn terminal(content: String) -> Self {
        Self {
            kind: ChunkKind::Response,
            content,
            last: true,
        }
    }

    fn error(content: String) -> Self {
        Self {
            kind: ChunkKind::Error,
            content,
            last: true,
        }
    }
}

/// Starts processing a query and returns the chunk stream. The receiver being
/// dropped is treated as a client disconnect: processing stops and nothing is
/// written back.
pub fn generate_response(
    state: Arc<AppState>,
    request: ChatQuery,
    session_id: String,
) -> mpsc::Receiver<ResponseChunk> {
    let (tx, rx) = mpsc::channel(100);
    tokio::spawn(async move {
        run(state, request, session_id, tx).await;
    });
    rx
}

async fn run(
    state: Arc<AppState>,
    request: ChatQuery,
    session_id: String,
    tx: mpsc::Sender<ResponseChunk>,
) {
    let query = request.query.trim();
    if query.is_empty() {
        let _ = tx
            .send(ResponseChunk::error("No query provided".to_string()))
            .await;
        return;
    }

    let memory = state.memory.for_session(&session_id);

    // Canned routes skip retrieval and generation, but the exchange is still
    // recorded so "previous question" reflects what the user actually asked.
    if let Some(intent) = state.normalizer.match_special_intent(query) {
        tracing::info!("Special intent matched for session {}", session_id);
        let sentinel = intent.sentinel().to_string();
        if tx.send(ResponseChunk::terminal(sentinel.clone())).await.is_ok() {
            memory.add_interaction(query, &sentinel).await;
        }
        return;
    }

    if state.normalizer.is_memory_query(query) {
        let answer = match memory.get_previous_question().await {
            Some(previous) => format!("Your previous question was: '{}'", previous),
            None => "You haven't asked any questions yet in this session.".to_string(),
        };
        if tx.send(ResponseChunk::terminal(answer.clone())).await.is_ok() {
            memory.add_interaction(query, &answer).await;
        }
        return;
    }

    let normalized = state.normalizer.normalize(query);
    if let Some(cached) = state.cache.get(&normalized) {
        tracing::debug!("Cache hit for {:?}", normalized);
        if tx.send(ResponseChunk::terminal(cached.clone())).await.is_ok() {
            memory.add_interaction(query, &cached).await;
        }
        return;
    }

    let results = match state.retriever.retrieve(query, true).await {
        Ok(results) => results,
        Err(err) => {
            tracing::error!("Retrieval failed for session {}: {}", session_id, err);
            let _ = tx.send(ResponseChunk::error(err.to_string())).await;
            return;
        }
    };

    let institution = state.institutions.get(request.institution_id.as_deref());
    let allowed_domain = state.institutions.allowed_domain(institution);
    let references = extract_references(&results, &allowed_domain);

    let user_prompt = prompt::build_prompt(
        &memory.get_context().await,
        &prompt::personal_info_context(request.personal_info.as_ref()),
        &prompt::format_retrieved_content(&results),
        &state.institutions.processed_prompt(request.institution_id.as_deref()),
        query,
    );

    let mut stream = match state
        .generator
        .stream_chat(&state.settings.generation.system_prompt, &user_prompt)
        .await
    {
        Ok(stream) => stream,
        Err(err) => {
            tracing::error!("Generation failed for session {}: {}", session_id, err);
            let _ = tx.send(ResponseChunk::error(err.to_string())).await;
            return;
        }
    };

    let mut answer = String::new();
    while let Some(item) = stream.recv().await {
        match item {
            Ok(chunk) => {
                answer.push_str(&chunk);
                if tx.send(ResponseChunk::partial(chunk)).await.is_err() {
                    return;
                }
            }
            Err(err) => {
                tracing::error!("Stream failed for session {}: {}", session_id, err);
                let _ = tx.send(ResponseChunk::error(err.to_string())).await;
                return;
            }
        }
    }

    let references_block = format_references_block(&references).unwrap_or_default();
    if tx
        .send(ResponseChunk::terminal(references_block.clone()))
        .await
        .is_err()
    {
        return;
    }

    let full_answer = format!("{}{}", answer, references_block);
    state.cache.put(&normalized, &full_answer);
    memory.add_interaction(query, &full_answer).await;
}
