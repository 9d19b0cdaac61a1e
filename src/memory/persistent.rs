//! Key-value-backed conversation memory. Each session's interaction list is
//! stored as one serialized JSON blob whose TTL is refreshed on every write;
//! a read after expiry is indistinguishable from an empty history.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use super::kv::KvStore;
use super::{render_context, ConversationMemory, Interaction};

const KEY_PREFIX: &str = "conversation:";

pub struct KvConversationMemory {
    session_id: String,
    store: Arc<dyn KvStore>,
    max_history: usize,
    ttl: Duration,
}

impl KvConversationMemory {
    pub fn new(
        session_id: String,
        store: Arc<dyn KvStore>,
        max_history: usize,
        ttl: Duration,
    ) -> Self {
        Self {
            session_id,
            store,
            max_history,
            ttl,
        }
    }

    fn key(&self) -> String {
        format!("{}{}", KEY_PREFIX, self.session_id)
    }

    /// Store failures degrade to an empty history rather than failing the
    /// request; the session merely loses persistence.
    async fn load_history(&self) -> Vec<Interaction> {
        let blob = match self.store.get(&self.key()).await {
            Ok(Some(blob)) => blob,
            Ok(None) => return Vec::new(),
            Err(err) => {
                tracing::warn!(
                    "Failed to read conversation history for {}: {}",
                    self.session_id,
                    err
                );
                return Vec::new();
            }
        };

        match serde_json::from_slice::<Vec<Interaction>>(&blob) {
            Ok(history) => history,
            Err(err) => {
                tracing::warn!(
                    "Corrupt conversation blob for {}: {}; starting fresh",
                    self.session_id,
                    err
                );
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl ConversationMemory for KvConversationMemory {
    async fn add_interaction(&self, question: &str, answer: &str) {
        let mut history = self.load_history().await;
        history.push(Interaction {
            question: question.to_string(),
            answer: answer.to_string(),
            timestamp: Utc::now(),
        });
        if history.len() > self.max_history {
            let excess = history.len() - self.max_history;
            history.drain(..excess);
        }

        let blob = match serde_json::to_vec(&history) {
            Ok(blob) => blob,
            Err(err) => {
                tracing::warn!("Failed to serialize history for {}: {}", self.session_id, err);
                return;
            }
        };

        let key = self.key();
        if let Err(err) = self.store.set(&key, &blob).await {
            tracing::warn!(
                "Failed to persist interaction for {}: {}",
                self.session_id,
                err
            );
            return;
        }
        if let Err(err) = self.store.expire(&key, self.ttl).await {
            tracing::warn!("Failed to refresh TTL for {}: {}", self.session_id, err);
        }
    }

    async fn get_context(&self) -> String {
        render_context(&self.load_history().await)
    }

    async fn get_previous_question(&self) -> Option<String> {
        self.load_history()
            .await
            .last()
            .map(|entry| entry.question.clone())
    }

    async fn clear(&self) {
        if let Err(err) = self.store.delete(&self.key()).await {
            tracing::warn!(
                "Failed to clear conversation history for {}: {}",
                self.session_id,
                err
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::kv::SqliteKvStore;
    use crate::memory::InProcessMemory;

    async fn temp_memory_with_ttl(
        max_history: usize,
        ttl: Duration,
    ) -> (KvConversationMemory, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteKvStore::new(&dir.path().join("kv.db")).await.unwrap();
        let memory = KvConversationMemory::new(
            "session-1".to_string(),
            Arc::new(store),
            max_history,
            ttl,
        );
        (memory, dir)
    }

    async fn temp_memory(max_history: usize) -> (KvConversationMemory, tempfile::TempDir) {
        temp_memory_with_ttl(max_history, Duration::from_secs(86400)).await
    }

    #[tokio::test]
    async fn history_is_bounded_and_keeps_the_newest() {
        let (memory, _dir) = temp_memory(3).await;
        for i in 0..5 {
            memory
                .add_interaction(&format!("q{}", i), &format!("a{}", i))
                .await;
        }
        assert_eq!(
            memory.get_previous_question().await,
            Some("q4".to_string())
        );
        let context = memory.get_context().await;
        assert!(!context.contains("Q: q1\n"));
        assert!(context.contains("Q: q2\n"));
        assert!(context.contains("Q: q4\n"));
    }

    #[tokio::test]
    async fn backends_render_identical_context() {
        let (persistent, _dir) = temp_memory(5).await;
        let in_process = InProcessMemory::new(5);

        for (q, a) in [("first", "one"), ("second", "two")] {
            persistent.add_interaction(q, a).await;
            in_process.add_interaction(q, a).await;
        }

        assert_eq!(persistent.get_context().await, in_process.get_context().await);
    }

    #[tokio::test]
    async fn expired_sessions_read_as_no_history_yet() {
        let (memory, _dir) = temp_memory_with_ttl(5, Duration::from_secs(0)).await;
        memory.add_interaction("q", "a").await;
        // Timestamps have one-second resolution; wait past the deadline.
        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(memory.get_context().await, "");
        assert_eq!(memory.get_previous_question().await, None);
    }

    #[tokio::test]
    async fn clear_behaves_like_no_history_yet() {
        let (memory, _dir) = temp_memory(5).await;
        memory.add_interaction("q", "a").await;
        memory.clear().await;
        assert_eq!(memory.get_context().await, "");
        assert_eq!(memory.get_previous_question().await, None);
    }
}
