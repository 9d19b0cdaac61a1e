//! Shared application state, assembled once at startup.

use std::sync::Arc;
use std::time::Duration;

use crate::cache::AnswerCache;
use crate::core::config::{MemoryBackendKind, Settings};
use crate::core::errors::ApiError;
use crate::institutions::InstitutionManager;
use crate::llm::{Generator, HttpGenerator};
use crate::memory::kv::SqliteKvStore;
use crate::memory::MemoryRegistry;
use crate::query::QueryNormalizer;
use crate::retrieval::{HttpKnowledgeBase, Retriever};

pub struct AppState {
    pub settings: Settings,
    pub normalizer: Arc<QueryNormalizer>,
    pub institutions: InstitutionManager,
    pub retriever: Retriever,
    pub cache: AnswerCache,
    pub memory: MemoryRegistry,
    pub generator: Arc<dyn Generator>,
}

impl AppState {
    /// Builds every long-lived component from the loaded settings. The memory
    /// backend is selected here, once; requests never re-decide it.
    pub async fn initialize(settings: Settings) -> Result<Arc<Self>, ApiError> {
        let normalizer = Arc::new(QueryNormalizer::new());

        let kb = Arc::new(HttpKnowledgeBase::new(&settings.knowledge_base));
        let retriever = Retriever::new(
            kb,
            normalizer.clone(),
            settings.knowledge_base.num_results,
        );

        let cache = AnswerCache::new(&settings.cache);

        let memory = match settings.memory.backend {
            MemoryBackendKind::InProcess => {
                tracing::info!("Using in-process conversation memory");
                MemoryRegistry::in_process(settings.memory.max_history)
            }
            MemoryBackendKind::Persistent => {
                let store = SqliteKvStore::new(&settings.memory.store_path).await?;
                tracing::info!(
                    "Using persistent conversation memory at {:?}",
                    settings.memory.store_path
                );
                MemoryRegistry::persistent(
                    settings.memory.max_history,
                    Duration::from_secs(settings.memory.session_ttl_seconds),
                    Arc::new(store),
                )
            }
        };

        let institutions = match &settings.institutions_path {
            Some(path) => InstitutionManager::from_yaml_file(
                path,
                settings.default_institution_id.clone(),
            )?,
            None => InstitutionManager::builtin(settings.default_institution_id.clone()),
        };

        let generator: Arc<dyn Generator> = Arc::new(HttpGenerator::new(&settings.generation));

        Ok(Arc::new(Self {
            settings,
            normalizer,
            institutions,
            retriever,
            cache,
            memory,
            generator,
        }))
    }
}
