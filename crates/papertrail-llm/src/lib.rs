//! papertrail-llm — LLM backend abstraction used by the review agent.

pub mod backend;

pub use backend::{LlmBackend, LlmError, OllamaBackend};
