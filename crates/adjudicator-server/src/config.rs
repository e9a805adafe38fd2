//! Configuration file parsing for the server.
//!
//! Loads settings from a TOML file. Every field has a default, so a file
//! only needs the values it changes.

use adjudicator_engine::EngineConfig;
use adjudicator_extractor::ExtractorConfig;
use adjudicator_store::IndexRegistry;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Server configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse config TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// A value is out of range
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    /// The LLM API key environment variable is unset or empty
    #[error("Missing LLM API key: set the {0} environment variable")]
    MissingApiKey(String),
}

/// Server configuration loaded from TOML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "127.0.0.1")
    pub bind_address: String,

    /// Bind port (e.g., 8000)
    pub bind_port: u16,

    /// Clauses retrieved when a query does not say
    pub default_top_k: usize,

    /// Largest accepted request body (bytes)
    pub max_upload_bytes: usize,

    /// SQLite file for the decision log; no log when absent
    pub decision_log: Option<PathBuf>,

    /// LLM provider
    pub llm: LlmConfig,

    /// Embedding backend
    pub embedding: EmbeddingConfig,

    /// Text extraction and chunking
    pub extractor: ExtractorConfig,

    /// Index registry
    pub index: IndexConfig,

    /// Query handling
    pub engine: EngineSettings,
}

/// LLM provider settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// OpenAI-compatible API base URL
    pub endpoint: String,
    /// Model name
    pub model: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
    /// HTTP timeout per attempt (seconds)
    pub timeout_secs: u64,
    /// Attempts per call
    pub max_retries: u32,
}

/// Which embedding backend to run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackendKind {
    /// Offline feature hashing
    Hash,
    /// Ollama embedding server
    #[default]
    Ollama,
}

/// Embedding backend settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Backend
    pub backend: EmbeddingBackendKind,
    /// Ollama API endpoint
    pub endpoint: String,
    /// Ollama model name
    pub model: String,
    /// Vector dimension
    pub dimension: usize,
    /// HTTP timeout per attempt (seconds)
    pub timeout_secs: u64,
    /// Texts per embedding request
    pub batch_size: usize,
}

/// Index registry settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Maximum number of indexed documents
    pub capacity: usize,
    /// Idle time after which an index is dropped (seconds)
    pub ttl_secs: u64,
    /// Interval between expiry sweeps (seconds)
    pub sweep_interval_secs: u64,
}

/// Query handling settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Limit for a single LLM call, retries included (seconds)
    pub llm_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            bind_port: 8000,
            default_top_k: adjudicator_engine::pipeline::DEFAULT_TOP_K,
            max_upload_bytes: 25 * 1024 * 1024,
            decision_log: None,
            llm: LlmConfig::default(),
            embedding: EmbeddingConfig::default(),
            extractor: ExtractorConfig::default(),
            index: IndexConfig::default(),
            engine: EngineSettings::default(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: adjudicator_llm::chat::DEFAULT_ENDPOINT.to_string(),
            model: adjudicator_llm::chat::DEFAULT_MODEL.to_string(),
            api_key_env: "GROQ_API_KEY".to_string(),
            timeout_secs: adjudicator_llm::chat::DEFAULT_TIMEOUT_SECS,
            max_retries: adjudicator_llm::chat::DEFAULT_MAX_RETRIES,
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: EmbeddingBackendKind::default(),
            endpoint: adjudicator_store::ollama::DEFAULT_ENDPOINT.to_string(),
            model: adjudicator_store::ollama::DEFAULT_MODEL.to_string(),
            dimension: adjudicator_store::embedding::DEFAULT_DIMENSION,
            timeout_secs: adjudicator_store::ollama::DEFAULT_TIMEOUT_SECS,
            batch_size: adjudicator_store::ollama::DEFAULT_BATCH_SIZE,
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            capacity: adjudicator_store::registry::DEFAULT_CAPACITY,
            ttl_secs: adjudicator_store::registry::DEFAULT_TTL_SECS,
            sweep_interval_secs: 60,
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            llm_timeout_secs: adjudicator_engine::pipeline::DEFAULT_LLM_TIMEOUT_SECS,
        }
    }
}

impl ServerConfig {
    /// Load and validate configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: ServerConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every value is usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("default_top_k", self.default_top_k as u64),
            ("max_upload_bytes", self.max_upload_bytes as u64),
            ("llm.timeout_secs", self.llm.timeout_secs),
            ("llm.max_retries", u64::from(self.llm.max_retries)),
            ("embedding.dimension", self.embedding.dimension as u64),
            ("embedding.timeout_secs", self.embedding.timeout_secs),
            ("embedding.batch_size", self.embedding.batch_size as u64),
            ("index.capacity", self.index.capacity as u64),
            ("index.ttl_secs", self.index.ttl_secs),
            ("index.sweep_interval_secs", self.index.sweep_interval_secs),
            ("engine.llm_timeout_secs", self.engine.llm_timeout_secs),
        ];
        if let Some((name, _)) = positive.iter().find(|(_, value)| *value == 0) {
            return Err(ConfigError::Invalid(format!(
                "{} must be greater than 0",
                name
            )));
        }

        let retry_budget = self.llm_retry_budget();
        if Duration::from_secs(self.engine.llm_timeout_secs) < retry_budget {
            return Err(ConfigError::Invalid(format!(
                "engine.llm_timeout_secs ({}) is shorter than the LLM retry budget of {}s \
                 ({} attempts of {}s plus backoff)",
                self.engine.llm_timeout_secs,
                retry_budget.as_secs_f64().ceil(),
                self.llm.max_retries,
                self.llm.timeout_secs
            )));
        }

        if self.llm.api_key_env.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "llm.api_key_env must name an environment variable".to_string(),
            ));
        }

        self.extractor
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    /// Longest a retrying LLM call can take under `[llm]`
    pub fn llm_retry_budget(&self) -> Duration {
        adjudicator_llm::chat::retry_budget(
            Duration::from_secs(self.llm.timeout_secs),
            self.llm.max_retries,
            adjudicator_llm::chat::DEFAULT_RETRY_BASE_DELAY,
        )
    }

    /// Get the full bind address (address:port)
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.bind_port)
    }

    /// Read the LLM API key from the configured environment variable
    pub fn api_key(&self) -> Result<String, ConfigError> {
        std::env::var(&self.llm.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingApiKey(self.llm.api_key_env.clone()))
    }

    /// Engine tunables
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            llm_timeout: Duration::from_secs(self.engine.llm_timeout_secs),
            default_top_k: self.default_top_k,
        }
    }

    /// An empty registry sized by `[index]`
    pub fn index_registry(&self) -> IndexRegistry {
        IndexRegistry::new(self.index.capacity, Duration::from_secs(self.index.ttl_secs))
    }

    /// Interval between expiry sweeps
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.index.sweep_interval_secs)
    }
}
