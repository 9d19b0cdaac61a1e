use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// One passage returned by the knowledge base. Scores come pre-computed from
/// the retrieval backend and are never recomputed locally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub content: String,
    pub score: f64,
    #[serde(default)]
    pub location: Location,
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
    #[serde(default)]
    pub document_metadata: BTreeMap<String, Value>,
}

/// Provenance of a retrieved passage.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
pub enum Location {
    Web {
        url: String,
    },
    S3 {
        uri: String,
    },
    #[default]
    #[serde(other)]
    Unknown,
}

/// Failure taxonomy preserved from the underlying retrieval service. Each
/// variant carries its own human-readable message; they are never collapsed
/// into one generic string.
#[derive(Debug, Clone, Error)]
pub enum RetrievalError {
    #[error("the knowledge base is throttling requests; please try again shortly")]
    Throttled,
    #[error("access to the knowledge base was denied; check service credentials")]
    AccessDenied,
    #[error("knowledge base service error: {0}")]
    Service(String),
    #[error("could not reach the knowledge base: {0}")]
    Connection(String),
}

impl RetrievalError {
    /// Transient errors are retryable by the caller; retry policy itself is
    /// out of scope here.
    pub fn is_transient(&self) -> bool {
        matches!(self, RetrievalError::Throttled | RetrievalError::Connection(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_messages_are_distinct() {
        let errors = [
            RetrievalError::Throttled,
            RetrievalError::AccessDenied,
            RetrievalError::Service("500".into()),
            RetrievalError::Connection("refused".into()),
        ];
        let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        for (i, a) in messages.iter().enumerate() {
            for b in messages.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn transient_classification() {
        assert!(RetrievalError::Throttled.is_transient());
        assert!(RetrievalError::Connection("x".into()).is_transient());
        assert!(!RetrievalError::AccessDenied.is_transient());
        assert!(!RetrievalError::Service("x".into()).is_transient());
    }
}
