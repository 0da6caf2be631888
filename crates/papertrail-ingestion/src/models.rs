//! Data models for the retrieval and indexing pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Catalogs the retrieval pipeline can consult, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogSource {
    SemanticScholar,
    Arxiv,
    GoogleScholar,
}

impl CatalogSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CatalogSource::SemanticScholar => "semantic_scholar",
            CatalogSource::Arxiv           => "arxiv",
            CatalogSource::GoogleScholar   => "google_scholar",
        }
    }
}

impl fmt::Display for CatalogSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One retrieved paper.
///
/// Created by a source adapter, `full_text` is filled in by the PDF
/// extractor; afterwards the record is only read. A record without a
/// `pdf_url` always carries an empty `full_text`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperRecord {
    pub title: String,
    pub abstract_text: Option<String>,
    pub authors: Vec<String>,
    pub year: Option<i32>,
    /// Landing page.
    pub source_url: Option<String>,
    /// Direct document URL.
    pub pdf_url: Option<String>,
    pub full_text: String,
    pub source: CatalogSource,
}

impl PaperRecord {
    pub fn new(source: CatalogSource, title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            abstract_text: None,
            authors: Vec::new(),
            year: None,
            source_url: None,
            pdf_url: None,
            full_text: String::new(),
            source,
        }
    }

    /// Normalised title used for deduplication; `None` for blank titles.
    pub fn dedup_key(&self) -> Option<String> {
        let key = self.title.trim().to_lowercase();
        (!key.is_empty()).then_some(key)
    }

    /// The document URL, if it is non-blank.
    pub fn pdf_url(&self) -> Option<&str> {
        self.pdf_url.as_deref().filter(|u| !u.trim().is_empty())
    }

    pub fn authors_joined(&self) -> String {
        self.authors.join(", ")
    }

    pub fn year_label(&self) -> String {
        self.year.map(|y| y.to_string()).unwrap_or_default()
    }
}

/// One indexable unit of a paper's full text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub content: String,
    pub paper_title: String,
    pub authors_joined: String,
    pub year: String,
    /// `"<i>/<n>"`, 1-based.
    pub position: String,
}

impl Chunk {
    /// Parse `position` back into `(i, n)`.
    #[cfg(test)]
    pub(crate) fn position_parts(&self) -> Option<(usize, usize)> {
        let (i, n) = self.position.split_once('/')?;
        Some((i.parse().ok()?, n.parse().ok()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedup_key_normalises_case_and_whitespace() {
        let a = PaperRecord::new(CatalogSource::Arxiv, "Deep Learning");
        let b = PaperRecord::new(CatalogSource::GoogleScholar, "  deep learning ");
        assert_eq!(a.dedup_key(), b.dedup_key());
    }

    #[test]
    fn test_blank_title_has_no_dedup_key() {
        let p = PaperRecord::new(CatalogSource::SemanticScholar, "   ");
        assert_eq!(p.dedup_key(), None);
    }

    #[test]
    fn test_blank_pdf_url_is_treated_as_missing() {
        let mut p = PaperRecord::new(CatalogSource::Arxiv, "X");
        p.pdf_url = Some("  ".to_string());
        assert_eq!(p.pdf_url(), None);
    }

    #[test]
    fn test_position_parts() {
        let c = Chunk {
            content: "text".to_string(),
            paper_title: "T".to_string(),
            authors_joined: String::new(),
            year: String::new(),
            position: "3/7".to_string(),
        };
        assert_eq!(c.position_parts(), Some((3, 7)));
    }
}
