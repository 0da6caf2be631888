use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::separator::Separator;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(String),

    #[error("IO error reading config: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid separator {raw:?}: {source}")]
    Separator { raw: String, source: regex::Error },

    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub processing: ProcessingConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub embedding: EmbeddingSettings,
    #[serde(default)]
    pub llm: LlmSettings,
}

// ── Processing ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingConfig {
    /// Advisory cap used to decide whether lower-priority catalogs are consulted.
    #[serde(default = "default_max_papers")]
    pub max_papers: usize,
    /// Maximum characters per chunk.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Characters shared between consecutive chunks of one paper.
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
    /// Split boundaries in priority order; see [`Separator::parse`].
    #[serde(default = "default_separators")]
    pub separators: Vec<String>,
    /// Chunks retrieved per question by the review step.
    #[serde(default = "default_retrieval_k")]
    pub retrieval_k: usize,
}

fn default_max_papers()    -> usize { 3 }
fn default_chunk_size()    -> usize { 1000 }
fn default_chunk_overlap() -> usize { 64 }
fn default_retrieval_k()   -> usize { 10 }
fn default_separators()    -> Vec<String> {
    vec!["\n\n".to_string(), "\n".to_string(), r"\.\s+".to_string(), " ".to_string()]
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            max_papers: default_max_papers(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            separators: default_separators(),
            retrieval_k: default_retrieval_k(),
        }
    }
}

impl ProcessingConfig {
    /// Compile the configured separators in priority order.
    pub fn compiled_separators(&self) -> Result<Vec<Separator>, ConfigError> {
        self.separators
            .iter()
            .map(|raw| {
                Separator::parse(raw)
                    .map_err(|source| ConfigError::Separator { raw: raw.clone(), source })
            })
            .collect()
    }
}

// ── Sources ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    /// Optional Semantic Scholar key, sent as `x-api-key`.
    #[serde(default)]
    pub semantic_scholar_api_key: Option<String>,
    #[serde(default = "default_catalog_timeout")]
    pub catalog_timeout_secs: u64,
    #[serde(default = "default_pdf_timeout")]
    pub pdf_timeout_secs: u64,
}

fn default_catalog_timeout() -> u64 { 15 }
fn default_pdf_timeout()     -> u64 { 20 }

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            semantic_scholar_api_key: None,
            catalog_timeout_secs: default_catalog_timeout(),
            pdf_timeout_secs: default_pdf_timeout(),
        }
    }
}

// ── Embedding ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingBackend {
    Ollama,
    OpenAiCompatible,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingSettings {
    #[serde(default = "default_embedding_backend")]
    pub backend: EmbeddingBackend,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default = "default_local_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,
}

fn default_embedding_backend() -> EmbeddingBackend { EmbeddingBackend::Ollama }
fn default_embedding_model()   -> String { "all-minilm".to_string() }
fn default_local_base_url()    -> String { "http://localhost:11434".to_string() }
fn default_batch_size()        -> usize { 32 }
fn default_embedding_timeout() -> u64 { 60 }

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            backend: default_embedding_backend(),
            model: default_embedding_model(),
            base_url: default_local_base_url(),
            api_key: None,
            batch_size: default_batch_size(),
            timeout_secs: default_embedding_timeout(),
        }
    }
}

// ── LLM ───────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    #[serde(default = "default_local_base_url")]
    pub base_url: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Upper bound for the context window requested from the model.
    #[serde(default = "default_num_ctx")]
    pub num_ctx: usize,
    /// Tokens reserved for the answer on top of prompt tokens.
    #[serde(default = "default_answer_buffer")]
    pub answer_buffer: usize,
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

fn default_llm_model()     -> String { "llama3:8b".to_string() }
fn default_temperature()   -> f32 { 0.2 }
fn default_num_ctx()       -> usize { 65_536 }
fn default_answer_buffer() -> usize { 512 }
fn default_llm_timeout()   -> u64 { 600 }

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: default_local_base_url(),
            model: default_llm_model(),
            temperature: default_temperature(),
            num_ctx: default_num_ctx(),
            answer_buffer: default_answer_buffer(),
            timeout_secs: default_llm_timeout(),
        }
    }
}

// ── Loading & validation ──────────────────────────────────────────────────────

impl Config {
    /// Load configuration from papertrail.toml.
    /// Checks PAPERTRAIL_CONFIG env var first, then current directory.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("PAPERTRAIL_CONFIG")
            .unwrap_or_else(|_| "papertrail.toml".to_string());
        Self::from_path(&path)
    }

    /// Load and validate a TOML or YAML file (chosen by extension).
    pub fn from_path(path: &str) -> Result<Self, ConfigError> {
        if !Path::new(path).exists() {
            return Err(ConfigError::NotFound(path.to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        let config: Config = if path.ends_with(".yaml") || path.ends_with(".yml") {
            serde_yaml::from_str(&content)?
        } else {
            toml::from_str(&content)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Enforce the invariants the pipeline relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let p = &self.processing;
        if p.max_papers == 0 {
            return Err(invalid("processing.max_papers", "must be at least 1"));
        }
        if p.chunk_size == 0 {
            return Err(invalid("processing.chunk_size", "must be greater than 0"));
        }
        if p.chunk_overlap >= p.chunk_size {
            return Err(invalid(
                "processing.chunk_overlap",
                format!("{} must be smaller than chunk_size {}", p.chunk_overlap, p.chunk_size),
            ));
        }
        if p.separators.is_empty() {
            return Err(invalid("processing.separators", "at least one separator is required"));
        }
        if p.retrieval_k == 0 {
            return Err(invalid("processing.retrieval_k", "must be at least 1"));
        }
        p.compiled_separators()?;

        if self.embedding.batch_size == 0 {
            return Err(invalid("embedding.batch_size", "must be at least 1"));
        }
        if self.llm.num_ctx == 0 {
            return Err(invalid("llm.num_ctx", "must be greater than 0"));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid { field, reason: reason.into() }
}
