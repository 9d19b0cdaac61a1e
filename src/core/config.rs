use std::env;
use std::path::PathBuf;

use serde::Deserialize;

use crate::core::errors::ApiError;

/// Process-wide settings, loaded once at startup from an optional YAML file
/// and overridden by environment variables. Not hot-reloaded.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub knowledge_base: KnowledgeBaseSettings,
    pub generation: GenerationSettings,
    pub cache: CacheSettings,
    pub memory: MemorySettings,
    pub institutions_path: Option<PathBuf>,
    pub default_institution_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { port: 8000 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct KnowledgeBaseSettings {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub num_results: usize,
    pub min_score: f64,
}

impl Default for KnowledgeBaseSettings {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:9200/retrieve".to_string(),
            api_key: None,
            num_results: 5,
            min_score: 0.5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub model: String,
    pub system_prompt: String,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8080/v1/chat/completions".to_string(),
            api_key: None,
            model: "default".to_string(),
            system_prompt: "You are a university career guidance expert. Follow instructions precisely.".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub enabled: bool,
    pub expiry_seconds: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            expiry_seconds: 3600,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MemorySettings {
    pub backend: MemoryBackendKind,
    pub max_history: usize,
    pub session_ttl_seconds: u64,
    pub store_path: PathBuf,
}

impl Default for MemorySettings {
    fn default() -> Self {
        Self {
            backend: MemoryBackendKind::InProcess,
            max_history: 5,
            session_ttl_seconds: 86400,
            store_path: PathBuf::from("sessions.db"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryBackendKind {
    InProcess,
    Persistent,
}

pub fn config_path() -> PathBuf {
    if let Ok(path) = env::var("COUNSEL_CONFIG_PATH") {
        return PathBuf::from(path);
    }
    PathBuf::from("config.yml")
}

pub fn load() -> Result<Settings, ApiError> {
    let path = config_path();
    let mut settings = if path.exists() {
        let contents = std::fs::read_to_string(&path).map_err(ApiError::internal)?;
        serde_yaml::from_str::<Settings>(&contents)
            .map_err(|e| ApiError::BadRequest(format!("Invalid config file {:?}: {}", path, e)))?
    } else {
        Settings::default()
    };

    apply_env_overrides(&mut settings);
    Ok(settings)
}

fn apply_env_overrides(settings: &mut Settings) {
    if let Some(port) = env_parse::<u16>("PORT") {
        settings.server.port = port;
    }
    if let Ok(endpoint) = env::var("KB_ENDPOINT") {
        settings.knowledge_base.endpoint = endpoint;
    }
    if let Ok(key) = env::var("KB_API_KEY") {
        settings.knowledge_base.api_key = Some(key);
    }
    if let Some(num) = env_parse::<usize>("RETRIEVAL_NUM_RESULTS") {
        settings.knowledge_base.num_results = num;
    }
    if let Some(score) = env_parse::<f64>("RETRIEVAL_MIN_SCORE") {
        settings.knowledge_base.min_score = score;
    }
    if let Ok(endpoint) = env::var("LLM_ENDPOINT") {
        settings.generation.endpoint = endpoint;
    }
    if let Ok(key) = env::var("LLM_API_KEY") {
        settings.generation.api_key = Some(key);
    }
    if let Ok(model) = env::var("LLM_MODEL") {
        settings.generation.model = model;
    }
    if let Ok(enabled) = env::var("CACHE_ENABLED") {
        settings.cache.enabled = enabled.to_lowercase() == "true";
    }
    if let Some(secs) = env_parse::<u64>("CACHE_EXPIRY_SECONDS") {
        settings.cache.expiry_seconds = secs;
    }
    if let Ok(backend) = env::var("MEMORY_BACKEND") {
        match backend.as_str() {
            "persistent" => settings.memory.backend = MemoryBackendKind::Persistent,
            "in_process" => settings.memory.backend = MemoryBackendKind::InProcess,
            other => tracing::warn!("Unknown MEMORY_BACKEND {:?}; keeping configured value", other),
        }
    }
    if let Some(max) = env_parse::<usize>("MEMORY_MAX_HISTORY") {
        settings.memory.max_history = max;
    }
    if let Some(ttl) = env_parse::<u64>("MEMORY_SESSION_TTL") {
        settings.memory.session_ttl_seconds = ttl;
    }
    if let Ok(path) = env::var("MEMORY_STORE_PATH") {
        settings.memory.store_path = PathBuf::from(path);
    }
    if let Ok(id) = env::var("DEFAULT_INSTITUTION_ID") {
        settings.default_institution_id = Some(id);
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|val| val.parse::<T>().ok())
}
