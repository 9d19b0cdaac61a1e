use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Value};

use super::types::{Location, RetrievalError, RetrievalResult};
use crate::core::config::KnowledgeBaseSettings;

/// The sole contract the retriever depends on from the retrieval backend:
/// a text query plus a result budget, answered with scored passages.
#[async_trait]
pub trait KnowledgeBase: Send + Sync {
    async fn query(&self, text: &str, top_k: usize)
        -> Result<Vec<RetrievalResult>, RetrievalError>;
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    #[serde(rename = "retrievalResults", default)]
    results: Vec<WireResult>,
}

#[derive(Debug, Deserialize)]
struct WireResult {
    content: WireContent,
    #[serde(default)]
    score: f64,
    location: Option<WireLocation>,
    #[serde(default)]
    metadata: BTreeMap<String, Value>,
    #[serde(rename = "documentMetadata", default)]
    document_metadata: BTreeMap<String, Value>,
}

#[derive(Debug, Deserialize)]
struct WireContent {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct WireLocation {
    #[serde(rename = "type", default)]
    location_type: String,
    #[serde(rename = "webLocation")]
    web_location: Option<WireUrl>,
    #[serde(rename = "s3Location")]
    s3_location: Option<WireUri>,
}

#[derive(Debug, Deserialize)]
struct WireUrl {
    url: String,
}

#[derive(Debug, Deserialize)]
struct WireUri {
    uri: String,
}

/// HTTP knowledge-base client.
#[derive(Clone)]
pub struct HttpKnowledgeBase {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    min_score: f64,
}

impl HttpKnowledgeBase {
    pub fn new(settings: &KnowledgeBaseSettings) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: settings.endpoint.clone(),
            api_key: settings.api_key.clone(),
            min_score: settings.min_score,
        }
    }
}

#[async_trait]
impl KnowledgeBase for HttpKnowledgeBase {
    async fn query(
        &self,
        text: &str,
        top_k: usize,
    ) -> Result<Vec<RetrievalResult>, RetrievalError> {
        let body = json!({ "text": text, "top_k": top_k, "min_score": self.min_score });

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.header("x-api-key", key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| RetrievalError::Connection(e.to_string()))?;

        match response.status() {
            StatusCode::TOO_MANY_REQUESTS => return Err(RetrievalError::Throttled),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(RetrievalError::AccessDenied)
            }
            status if !status.is_success() => {
                return Err(RetrievalError::Service(format!("HTTP {}", status)))
            }
            _ => {}
        }

        let wire: WireResponse = response
            .json()
            .await
            .map_err(|e| RetrievalError::Service(format!("malformed response: {}", e)))?;

        Ok(wire.results.into_iter().map(into_result).collect())
    }
}

fn into_result(wire: WireResult) -> RetrievalResult {
    let location = match wire.location {
        Some(loc) if loc.location_type == "WEB" => loc
            .web_location
            .map(|web| Location::Web { url: web.url })
            .unwrap_or_default(),
        Some(loc) if loc.location_type == "S3" => loc
            .s3_location
            .map(|s3| Location::S3 { uri: s3.uri })
            .unwrap_or_default(),
        _ => Location::Unknown,
    };

    RetrievalResult {
        content: wire.content.text,
        score: wire.score,
        location,
        metadata: wire.metadata,
        document_metadata: wire.document_metadata,
    }
}
