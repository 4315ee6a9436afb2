use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Configuration for one question-answering run.
///
/// Everything the pipeline needs is threaded in through this value at
/// construction time; core components never read the process environment
/// themselves. Environment overrides are applied once, explicitly, via
/// [`apply_env`](Config::apply_env).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// Configuration for the generation backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub model: String,
    pub base_url: String,
    /// API key for the backend. Usually supplied via `ASKDOC_API_KEY`
    /// rather than written into the config file.
    #[serde(default)]
    pub api_key: String,
    pub temperature: f64,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Configuration for the embedding backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    pub model: String,
    /// Number of chunk embedding requests allowed in flight at once.
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Chunking and retrieval parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub top_k: usize,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_workers() -> usize {
    4
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "meta-llama/llama-3.1-8b-instruct:free".to_string(),
            base_url: "https://openrouter.ai/api/v1".to_string(),
            api_key: String::new(),
            temperature: 0.0,
            max_tokens: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "text-embedding-3-small".to_string(),
            workers: default_workers(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 50,
            top_k: 4,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm: LlmConfig::default(),
            embedding: EmbeddingConfig::default(),
            pipeline: PipelineConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from `config.yaml` if it exists, otherwise use defaults.
    pub fn load_or_default() -> Self {
        Self::load("config.yaml").unwrap_or_default()
    }

    /// Apply `ASKDOC_*` environment overrides.
    ///
    /// This is the single place the process environment is consulted;
    /// components downstream only ever see the resulting config value.
    /// `OPENROUTER_API_KEY` is honored as a fallback for the API key.
    pub fn apply_env(&mut self) {
        if let Ok(key) = std::env::var("ASKDOC_API_KEY") {
            self.llm.api_key = key;
        } else if let Ok(key) = std::env::var("OPENROUTER_API_KEY") {
            self.llm.api_key = key;
        }
        if let Ok(url) = std::env::var("ASKDOC_BASE_URL") {
            self.llm.base_url = url;
        }
        if let Ok(model) = std::env::var("ASKDOC_MODEL") {
            self.llm.model = model;
        }
        if let Ok(model) = std::env::var("ASKDOC_EMBEDDING_MODEL") {
            self.embedding.model = model;
        }
        if let Ok(size) = std::env::var("ASKDOC_CHUNK_SIZE") {
            if let Ok(size) = size.parse() {
                self.pipeline.chunk_size = size;
            }
        }
        if let Ok(overlap) = std::env::var("ASKDOC_CHUNK_OVERLAP") {
            if let Ok(overlap) = overlap.parse() {
                self.pipeline.chunk_overlap = overlap;
            }
        }
    }

    /// Reject invalid chunking and search parameters.
    ///
    /// Called before the pipeline starts so a bad configuration never
    /// reaches the embedding backend.
    pub fn validate(&self) -> Result<()> {
        if self.pipeline.chunk_size == 0 {
            return Err(ConfigError::Invalid(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        if self.pipeline.chunk_overlap >= self.pipeline.chunk_size {
            return Err(ConfigError::Invalid(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.pipeline.chunk_overlap, self.pipeline.chunk_size
            )));
        }
        if self.pipeline.top_k == 0 {
            return Err(ConfigError::Invalid(
                "top_k must be greater than zero".to_string(),
            ));
        }
        if self.embedding.workers == 0 {
            return Err(ConfigError::Invalid(
                "embedding.workers must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.chunk_size, 500);
        assert_eq!(config.chunk_overlap, 50);
        assert_eq!(config.top_k, 4);
    }

    #[test]
    fn test_llm_defaults() {
        let config = LlmConfig::default();
        assert_eq!(config.temperature, 0.0);
        assert!(config.api_key.is_empty());
        assert_eq!(config.timeout_secs, 30);
    }

    #[test]
    fn test_validate_accepts_defaults() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_chunk_size() {
        let mut config = Config::default();
        config.pipeline.chunk_size = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validate_rejects_overlap_at_least_chunk_size() {
        let mut config = Config::default();
        config.pipeline.chunk_size = 10;
        config.pipeline.chunk_overlap = 12;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validate_rejects_zero_top_k() {
        let mut config = Config::default();
        config.pipeline.top_k = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let yaml = "pipeline:\n  chunk_size: 200\n  chunk_overlap: 20\n  top_k: 2\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.pipeline.chunk_size, 200);
        assert_eq!(config.llm.base_url, "https://openrouter.ai/api/v1");
    }
}
