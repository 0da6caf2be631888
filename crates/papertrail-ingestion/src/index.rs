//! In-memory semantic index over paper chunks.
//!
//! Built once per run from the retrieved papers and read-only afterwards.
//! Search is brute-force cosine similarity.

use std::sync::Arc;
use tracing::{debug, info, instrument};

use papertrail_config::{ConfigError, ProcessingConfig};

use crate::chunker::{build_chunks, RecursiveSplitter};
use crate::embedding::Embedder;
use crate::error::{IngestionError, Result};
use crate::models::{Chunk, PaperRecord};

/// Chunking parameters used when building an index.
#[derive(Debug, Clone)]
pub struct IndexConfig {
    pub splitter: RecursiveSplitter,
}

impl IndexConfig {
    pub fn from_processing(cfg: &ProcessingConfig) -> std::result::Result<Self, ConfigError> {
        Ok(Self { splitter: RecursiveSplitter::from_config(cfg)? })
    }
}

/// A search hit with its cosine similarity to the query.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

pub struct SemanticIndex {
    entries: Vec<(Chunk, Vec<f32>)>,
    embedder: Arc<dyn Embedder>,
}

impl SemanticIndex {
    /// Chunk every paper, embed the chunks in batches and keep them in
    /// insertion order.
    ///
    /// Fails with [`IngestionError::EmptyCorpus`] when no paper yields a
    /// single chunk.
    #[instrument(skip_all, fields(papers = papers.len()))]
    pub async fn build(papers: &[PaperRecord], cfg: &IndexConfig, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let chunks = build_chunks(papers, &cfg.splitter);
        if chunks.is_empty() {
            return Err(IngestionError::EmptyCorpus { papers: papers.len() });
        }

        let mut entries = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(embedder.batch_size().max(1)) {
            let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
            let vectors = embedder.embed_batch(&texts).await?;
            if vectors.len() != batch.len() {
                return Err(IngestionError::Embedding(format!(
                    "expected {} vectors, got {}",
                    batch.len(),
                    vectors.len()
                )));
            }
            entries.extend(batch.iter().cloned().zip(vectors));
            debug!(embedded = entries.len(), total = chunks.len(), "Embedded batch");
        }

        info!(chunks = entries.len(), "Semantic index built");
        Ok(Self { entries, embedder })
    }

    /// Top-`k` chunks by descending cosine similarity; equal scores keep
    /// insertion order.
    #[instrument(skip(self))]
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<ScoredChunk>> {
        let query_vec = self.embedder.embed_query(query).await?;

        let mut scored: Vec<ScoredChunk> = self
            .entries
            .iter()
            .map(|(chunk, vec)| ScoredChunk { chunk: chunk.clone(), score: cosine_similarity(vec, &query_vec) })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        debug!(hits = scored.len(), "Index search complete");
        Ok(scored)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.entries.iter().map(|(chunk, _)| chunk)
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
