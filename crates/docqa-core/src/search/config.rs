//! Retrieval configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::error::{DocQaError, DocQaResult};

/// Main configuration, loaded once at process start and passed explicitly
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocQaConfig {
    /// Embedding API configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Answer generation API configuration
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Chunking and top-k behavior
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Paths configuration
    #[serde(default)]
    pub paths: PathsConfig,

    /// Compute device configuration
    #[serde(default)]
    pub device: DeviceConfig,
}

/// Embedding API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// API key (can also use EMBEDDING_API_KEY / OPENAI_API_KEY env var)
    #[serde(default)]
    pub api_key: Option<String>,

    /// API base URL
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Model name
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Embedding dimensions
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,

    /// Batch size for embedding requests
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: default_api_base(),
            model: default_embedding_model(),
            dimensions: default_dimensions(),
            batch_size: default_batch_size(),
        }
    }
}

impl EmbeddingConfig {
    /// Get API key from config or environment
    pub fn get_api_key(&self) -> DocQaResult<String> {
        if let Some(ref key) = self.api_key {
            if !key.is_empty() {
                return Ok(key.clone());
            }
        }

        std::env::var("EMBEDDING_API_KEY")
            .or_else(|_| std::env::var("OPENAI_API_KEY"))
            .map_err(|_| DocQaError::ApiKeyMissing)
    }
}

fn default_api_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_dimensions() -> usize {
    // Auto-detected from the first embedding response when the model ignores it
    1536
}

fn default_batch_size() -> usize {
    10
}

/// Answer generation API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// API key (can also use GENERATION_API_KEY / GENAI_KEY env var)
    #[serde(default)]
    pub api_key: Option<String>,

    /// API base URL
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Chat model name
    #[serde(default = "default_generation_model")]
    pub model: String,

    /// Upper bound on generated tokens
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: default_api_base(),
            model: default_generation_model(),
            max_tokens: default_max_tokens(),
        }
    }
}

impl GenerationConfig {
    /// Get API key from config or environment
    pub fn get_api_key(&self) -> DocQaResult<String> {
        if let Some(ref key) = self.api_key {
            if !key.is_empty() {
                return Ok(key.clone());
            }
        }

        std::env::var("GENERATION_API_KEY")
            .or_else(|_| std::env::var("GENAI_KEY"))
            .map_err(|_| DocQaError::ApiKeyMissing)
    }
}

fn default_generation_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_max_tokens() -> u32 {
    1024
}

/// Chunking and retrieval behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Passage size in characters
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Number of passages handed to the answer generator
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            top_k: default_top_k(),
        }
    }
}

fn default_chunk_size() -> usize {
    500
}

fn default_top_k() -> usize {
    3
}

/// Paths configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directory holding the per-session artifacts
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

impl PathsConfig {
    /// Get session data directory, using default if not specified
    pub fn get_data_dir(&self) -> PathBuf {
        if let Some(ref path) = self.data_dir {
            return path.clone();
        }

        DocQaConfig::config_dir().join("data")
    }
}

/// Compute device configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Device memory available for indices; unbounded host memory when unset
    #[serde(default)]
    pub memory_limit_bytes: Option<u64>,
}

impl DocQaConfig {
    /// Load configuration from file and environment
    /// Priority: environment variables > config.toml > defaults
    pub fn load() -> DocQaResult<Self> {
        let toml_path = Self::config_path();
        let mut config = if toml_path.exists() {
            let content = std::fs::read_to_string(&toml_path)?;
            Self::from_toml(&content)?
        } else {
            Self::default()
        };

        config.apply_env();
        config.validate()?;

        log::debug!("Loaded configuration from {}", toml_path.display());
        Ok(config)
    }

    /// Parse a TOML document; missing sections fall back to defaults
    pub fn from_toml(content: &str) -> DocQaResult<Self> {
        toml::from_str(content).map_err(|e| DocQaError::Config(e.to_string()))
    }

    /// Override with environment variables
    fn apply_env(&mut self) {
        if let Ok(api_base) = std::env::var("EMBEDDING_API_BASE") {
            self.embedding.api_base = api_base;
        }
        if let Ok(api_key) =
            std::env::var("EMBEDDING_API_KEY").or_else(|_| std::env::var("OPENAI_API_KEY"))
        {
            self.embedding.api_key = Some(api_key);
        }
        if let Ok(model) = std::env::var("EMBEDDING_MODEL") {
            self.embedding.model = model;
        }

        if let Ok(api_base) = std::env::var("GENERATION_API_BASE") {
            self.generation.api_base = api_base;
        }
        if let Ok(api_key) =
            std::env::var("GENERATION_API_KEY").or_else(|_| std::env::var("GENAI_KEY"))
        {
            self.generation.api_key = Some(api_key);
        }
        if let Ok(model) = std::env::var("GENERATION_MODEL") {
            self.generation.model = model;
        }

        if let Ok(dir) = std::env::var("DOCQA_DATA_DIR") {
            self.paths.data_dir = Some(PathBuf::from(dir));
        }
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> DocQaResult<()> {
        if self.retrieval.chunk_size == 0 {
            return Err(DocQaError::Config("retrieval.chunk_size must be > 0".into()));
        }
        if self.retrieval.top_k == 0 {
            return Err(DocQaError::Config("retrieval.top_k must be > 0".into()));
        }
        if self.embedding.batch_size == 0 {
            return Err(DocQaError::Config("embedding.batch_size must be > 0".into()));
        }
        if self.device.memory_limit_bytes == Some(0) {
            return Err(DocQaError::Config(
                "device.memory_limit_bytes must be > 0 when set".into(),
            ));
        }
        Ok(())
    }

    /// Get base config directory
    fn config_dir() -> PathBuf {
        if let Ok(root) = std::env::var("DOCQA_ROOT") {
            return PathBuf::from(root);
        }

        dirs::home_dir()
            .map(|h| h.join(".docqa"))
            .unwrap_or_else(|| PathBuf::from(".docqa"))
    }

    /// Get config file path (config.toml)
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }
}
