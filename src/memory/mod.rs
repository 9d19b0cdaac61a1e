//! Conversation memory: a bounded, per-session log of question/answer pairs.
//!
//! Two interchangeable backends share one contract; callers are
//! backend-agnostic and `get_context()` output is byte-identical across them.

pub mod kv;
pub mod persistent;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use kv::KvStore;
use persistent::KvConversationMemory;

/// One completed question/answer exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interaction {
    pub question: String,
    pub answer: String,
    pub timestamp: DateTime<Utc>,
}

#[async_trait]
pub trait ConversationMemory: Send + Sync {
    /// Appends an interaction, dropping the oldest entry once the history
    /// exceeds `max_history`.
    async fn add_interaction(&self, question: &str, answer: &str);
    /// Renders all retained interactions as Q:/A: pairs, newest last.
    async fn get_context(&self) -> String;
    async fn get_previous_question(&self) -> Option<String>;
    async fn clear(&self);
}

/// Shared rendering so both backends produce identical context strings.
pub(crate) fn render_context(history: &[Interaction]) -> String {
    if history.is_empty() {
        return String::new();
    }
    let mut context = String::from("Previous conversation context:\n");
    for entry in history {
        context.push_str(&format!("Q: {}\nA: {}\n\n", entry.question, entry.answer));
    }
    context
}

/// Process-local backend. Lost on restart; no TTL.
pub struct InProcessMemory {
    max_history: usize,
    history: Mutex<Vec<Interaction>>,
}

impl InProcessMemory {
    pub fn new(max_history: usize) -> Self {
        Self {
            max_history,
            history: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ConversationMemory for InProcessMemory {
    async fn add_interaction(&self, question: &str, answer: &str) {
        let mut history = self.history.lock().expect("memory mutex poisoned");
        history.push(Interaction {
            question: question.to_string(),
            answer: answer.to_string(),
            timestamp: Utc::now(),
        });
        if history.len() > self.max_history {
            history.remove(0);
        }
    }

    async fn get_context(&self) -> String {
        let history = self.history.lock().expect("memory mutex poisoned");
        render_context(&history)
    }

    async fn get_previous_question(&self) -> Option<String> {
        let history = self.history.lock().expect("memory mutex poisoned");
        history.last().map(|entry| entry.question.clone())
    }

    async fn clear(&self) {
        self.history.lock().expect("memory mutex poisoned").clear();
    }
}

/// Owns the per-session memory objects; selected once at startup and injected
/// into the orchestrator.
///
/// Each session is expected to be driven by one request at a time; two
/// concurrent requests racing on the same session id may interleave their
/// memory writes. Accepted limitation, not guarded against.
pub struct MemoryRegistry {
    backend: Backend,
}

enum Backend {
    InProcess {
        max_history: usize,
        sessions: Mutex<HashMap<String, Arc<InProcessMemory>>>,
    },
    Persistent {
        max_history: usize,
        ttl: Duration,
        store: Arc<dyn KvStore>,
    },
}

impl MemoryRegistry {
    pub fn in_process(max_history: usize) -> Self {
        Self {
            backend: Backend::InProcess {
                max_history,
                sessions: Mutex::new(HashMap::new()),
            },
        }
    }

    pub fn persistent(max_history: usize, ttl: Duration, store: Arc<dyn KvStore>) -> Self {
        Self {
            backend: Backend::Persistent {
                max_history,
                ttl,
                store,
            },
        }
    }

    pub fn for_session(&self, session_id: &str) -> Arc<dyn ConversationMemory> {
        match &self.backend {
            Backend::InProcess {
                max_history,
                sessions,
            } => {
                let mut sessions = sessions.lock().expect("registry mutex poisoned");
                sessions
                    .entry(session_id.to_string())
                    .or_insert_with(|| Arc::new(InProcessMemory::new(*max_history)))
                    .clone()
            }
            Backend::Persistent {
                max_history,
                ttl,
                store,
            } => Arc::new(KvConversationMemory::new(
                session_id.to_string(),
                store.clone(),
                *max_history,
                *ttl,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn history_is_bounded_to_most_recent_entries() {
        let memory = InProcessMemory::new(3);
        for i in 0..7 {
            memory
                .add_interaction(&format!("q{}", i), &format!("a{}", i))
                .await;
        }

        let history = memory.history.lock().unwrap().clone();
        assert_eq!(history.len(), 3);
        let questions: Vec<&str> = history.iter().map(|e| e.question.as_str()).collect();
        assert_eq!(questions, vec!["q4", "q5", "q6"]);
    }

    #[tokio::test]
    async fn context_renders_q_a_pairs_newest_last() {
        let memory = InProcessMemory::new(5);
        memory.add_interaction("first", "one").await;
        memory.add_interaction("second", "two").await;

        assert_eq!(
            memory.get_context().await,
            "Previous conversation context:\nQ: first\nA: one\n\nQ: second\nA: two\n\n"
        );
    }

    #[tokio::test]
    async fn empty_history_renders_empty_context() {
        let memory = InProcessMemory::new(5);
        assert_eq!(memory.get_context().await, "");
        assert_eq!(memory.get_previous_question().await, None);
    }

    #[tokio::test]
    async fn previous_question_is_the_most_recent() {
        let memory = InProcessMemory::new(5);
        memory.add_interaction("first", "one").await;
        memory.add_interaction("second", "two").await;
        assert_eq!(
            memory.get_previous_question().await,
            Some("second".to_string())
        );
    }

    #[tokio::test]
    async fn clear_resets_the_session() {
        let memory = InProcessMemory::new(5);
        memory.add_interaction("q", "a").await;
        memory.clear().await;
        assert_eq!(memory.get_context().await, "");
    }

    #[tokio::test]
    async fn registry_returns_the_same_session_object() {
        let registry = MemoryRegistry::in_process(5);
        registry.for_session("s1").add_interaction("q", "a").await;
        assert_eq!(
            registry.for_session("s1").get_previous_question().await,
            Some("q".to_string())
        );
        assert_eq!(registry.for_session("s2").get_previous_question().await, None);
    }
}
