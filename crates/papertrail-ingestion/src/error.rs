//! Error types for the ingestion pipeline.

use thiserror::Error;

use crate::models::CatalogSource;

/// A catalog or document download could not contribute to the run.
///
/// Always recovered by the caller: the failing source contributes nothing
/// and the run continues with whatever the other sources returned.
#[derive(Debug, Clone, Error)]
#[error("{catalog} unavailable: {reason}")]
pub struct SourceUnavailable {
    pub catalog: CatalogSource,
    pub reason: String,
}

impl SourceUnavailable {
    pub fn new(catalog: CatalogSource, reason: impl std::fmt::Display) -> Self {
        Self { catalog, reason: reason.to_string() }
    }
}

#[derive(Debug, Error)]
pub enum IngestionError {
    /// Retrieval produced no papers at all.
    #[error("No papers found for query {query:?}")]
    NoPapersFound { query: String },

    /// Papers were retrieved but none yielded a single chunk of text.
    #[error("No chunks to index: none of the {papers} retrieved papers had extractable full text")]
    EmptyCorpus { papers: usize },

    #[error("Embedding error: {0}")]
    Embedding(String),
}

pub type Result<T> = std::result::Result<T, IngestionError>;
