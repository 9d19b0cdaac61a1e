//! Streaming text-generation client.
//!
//! The completion service is an opaque collaborator: a system prompt and a
//! user prompt in, incremental text chunks out. Chunks arrive through an
//! explicit channel with a tagged terminal value (closed = normal end,
//! `Err` = stream failure), so consumers never rely on implicit iterator
//! exhaustion semantics.

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::mpsc;

use crate::core::config::GenerationSettings;
use crate::core::errors::ApiError;

#[async_trait]
pub trait Generator: Send + Sync {
    /// Starts a streaming completion. Each received item is one text
    /// increment; an `Err` item terminates the stream.
    async fn stream_chat(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<mpsc::Receiver<Result<String, ApiError>>, ApiError>;
}

/// OpenAI-compatible chat-completions client with SSE streaming.
#[derive(Clone)]
pub struct HttpGenerator {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
}

impl HttpGenerator {
    pub fn new(settings: &GenerationSettings) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: settings.endpoint.clone(),
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
        }
    }
}

#[async_trait]
impl Generator for HttpGenerator {
    async fn stream_chat(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<mpsc::Receiver<Result<String, ApiError>>, ApiError> {
        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": user_prompt}
            ],
            "stream": true
        });

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let (tx, rx) = mpsc::channel(100);

        tokio::spawn(async move {
            let mut response = match request.send().await {
                Ok(res) => res,
                Err(err) => {
                    let _ = tx.send(Err(ApiError::internal(err))).await;
                    return;
                }
            };

            if !response.status().is_success() {
                let _ = tx
                    .send(Err(ApiError::internal(format!(
                        "Generation service error: HTTP {}",
                        response.status()
                    ))))
                    .await;
                return;
            }

            let mut buffer = String::new();
            loop {
                let chunk = match response.chunk().await {
                    Ok(Some(chunk)) => chunk,
                    Ok(None) => break,
                    Err(err) => {
                        let _ = tx.send(Err(ApiError::internal(err))).await;
                        return;
                    }
                };

                buffer.push_str(&String::from_utf8_lossy(&chunk));
                // SSE events can split across network chunks; only consume
                // complete lines and keep the remainder buffered.
                while let Some(newline) = buffer.find('\n') {
                    let line = buffer[..newline].trim().to_string();
                    buffer.drain(..=newline);

                    let Some(data) = line.strip_prefix("data: ") else {
                        continue;
                    };
                    if data == "[DONE]" {
                        return;
                    }
                    let Ok(event) = serde_json::from_str::<Value>(data) else {
                        continue;
                    };
                    let delta = event["choices"][0]["delta"]["content"]
                        .as_str()
                        .unwrap_or("");
                    if delta.is_empty() {
                        continue;
                    }
                    if tx.send(Ok(delta.to_string())).await.is_err() {
                        return;
                    }
                }
            }
        });

        Ok(rx)
    }
}
