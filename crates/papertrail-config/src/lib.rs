//! papertrail-config — Configuration for the retrieval and indexing pipeline.
//! Reads papertrail.toml (or a YAML file) from the current directory or the
//! path in the PAPERTRAIL_CONFIG env var, applies defaults and validates once.

mod config;
mod separator;

pub use config::{
    Config, ConfigError, EmbeddingBackend, EmbeddingSettings, LlmSettings, ProcessingConfig,
    SourcesConfig,
};
pub use separator::Separator;
