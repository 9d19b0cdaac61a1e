pub mod cache;
pub mod core;
pub mod institutions;
pub mod llm;
pub mod memory;
pub mod orchestrator;
pub mod prompt;
pub mod query;
pub mod references;
pub mod retrieval;
pub mod server;
pub mod state;
