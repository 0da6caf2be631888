//! papertrail-ingestion — Literature retrieval and indexing pipeline.
//! - Paper discovery (Semantic Scholar, arXiv, Google Scholar)
//! - Landing-page → PDF URL resolution
//! - Full-text PDF extraction
//! - Title deduplication
//! - Recursive separator-aware chunking
//! - Embedding and in-memory semantic index

pub mod sources;
pub mod pdf_parser;
pub mod dedup;
pub mod pipeline;
pub mod chunker;
pub mod embedding;
pub mod index;
pub mod models;
pub mod error;

pub use error::{IngestionError, SourceUnavailable};
pub use models::{CatalogSource, Chunk, PaperRecord};
