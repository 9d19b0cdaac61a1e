pub mod client;
pub mod retriever;
pub mod types;

pub use client::{HttpKnowledgeBase, KnowledgeBase};
pub use retriever::Retriever;
pub use types::{Location, RetrievalError, RetrievalResult};
