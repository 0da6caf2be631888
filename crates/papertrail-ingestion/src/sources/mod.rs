//! Literature catalog clients.

pub mod semantic_scholar;
pub mod arxiv;
pub mod scholar;
pub mod pdf_url;

use async_trait::async_trait;

use crate::error::SourceUnavailable;
use crate::models::{CatalogSource, PaperRecord};

pub use arxiv::ArxivClient;
pub use scholar::GoogleScholarClient;
pub use semantic_scholar::SemanticScholarClient;

/// Common interface for all literature catalog clients.
#[async_trait]
pub trait LiteratureSource: Send + Sync {
    /// Which catalog this client queries.
    fn catalog(&self) -> CatalogSource;

    /// Search for papers matching a query.
    ///
    /// Network, timeout and decode failures come back as
    /// [`SourceUnavailable`]; the client itself never logs them.
    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<PaperRecord>, SourceUnavailable>;
}

/// Collapse runs of whitespace (arXiv and Scholar wrap long titles).
pub(crate) fn squash_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
