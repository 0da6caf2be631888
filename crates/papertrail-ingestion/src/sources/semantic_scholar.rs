//! Semantic Scholar Graph API client.
//!
//! Endpoint: https://api.semanticscholar.org/graph/v1/paper/search
//! Only papers that expose an open-access PDF are kept.

use async_trait::async_trait;
use papertrail_common::{PapertrailError, SandboxClient as Client};
use std::time::Duration;
use tracing::{debug, instrument};

use crate::error::SourceUnavailable;
use crate::models::{CatalogSource, PaperRecord};
use super::LiteratureSource;

const S2_SEARCH_URL: &str = "https://api.semanticscholar.org/graph/v1/paper/search";
const S2_FIELDS:     &str = "title,url,abstract,authors,year,openAccessPdf";
// Graph API rejects larger page sizes with 400.
const S2_MAX_LIMIT:  usize = 100;

pub struct SemanticScholarClient {
    client: Client,
    api_key: Option<String>,
}

impl SemanticScholarClient {
    pub fn new(api_key: Option<String>, timeout: Duration) -> Result<Self, PapertrailError> {
        Ok(Self { client: Client::new(timeout)?, api_key })
    }

    #[instrument(skip(self))]
    async fn search_papers(&self, query: &str, max_results: usize) -> anyhow::Result<Vec<PaperRecord>> {
        let limit = search_limit(max_results).to_string();
        let mut req = self.client
            .get(S2_SEARCH_URL)?
            .query(&[
                ("query",  query),
                ("limit",  limit.as_str()),
                ("fields", S2_FIELDS),
            ]);
        if let Some(key) = &self.api_key {
            req = req.header("x-api-key", key.as_str());
        }

        let resp = req
            .send()
            .await?
            .error_for_status()?
            .json::<serde_json::Value>()
            .await?;

        let papers = parse_search_response(&resp);
        debug!(kept = papers.len(), "Semantic Scholar search returned results");
        Ok(papers)
    }
}

#[async_trait]
impl LiteratureSource for SemanticScholarClient {
    fn catalog(&self) -> CatalogSource {
        CatalogSource::SemanticScholar
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<PaperRecord>, SourceUnavailable> {
        self.search_papers(query, max_results)
            .await
            .map_err(|e| SourceUnavailable::new(self.catalog(), format!("{e:#}")))
    }
}

fn search_limit(max_results: usize) -> usize {
    max_results.min(S2_MAX_LIMIT)
}

// ── Conversion ─────────────────────────────────────────────────────────────

fn parse_search_response(resp: &serde_json::Value) -> Vec<PaperRecord> {
    resp["data"]
        .as_array()
        .map(|data| data.iter().filter_map(paper_to_record).collect())
        .unwrap_or_default()
}

fn paper_to_record(paper: &serde_json::Value) -> Option<PaperRecord> {
    let pdf_url = paper["openAccessPdf"]["url"]
        .as_str()
        .map(str::trim)
        .filter(|u| !u.is_empty())?;

    let mut record = PaperRecord::new(
        CatalogSource::SemanticScholar,
        paper["title"].as_str().unwrap_or(""),
    );
    record.abstract_text = paper["abstract"].as_str().map(String::from);
    record.authors = paper["authors"]
        .as_array()
        .map(|authors| {
            authors.iter()
                .filter_map(|a| a["name"].as_str())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default();
    record.year = paper["year"].as_i64().map(|y| y as i32);
    record.source_url = paper["url"].as_str().map(String::from);
    record.pdf_url = Some(pdf_url.to_string());
    Some(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_keeps_only_open_access() {
        let resp = serde_json::json!({
            "total": 3,
            "data": [
                {
                    "paperId": "a1",
                    "title": "Attention Is All You Need",
                    "abstract": "The dominant sequence transduction models...",
                    "authors": [{"authorId": "1", "name": "Ashish Vaswani"}, {"authorId": "2", "name": "Noam Shazeer"}],
                    "year": 2017,
                    "url": "https://www.semanticscholar.org/paper/a1",
                    "openAccessPdf": {"url": "https://arxiv.org/pdf/1706.03762.pdf", "status": "GREEN"}
                },
                {
                    "paperId": "b2",
                    "title": "Closed Paper",
                    "authors": [],
                    "year": 2020,
                    "openAccessPdf": null
                },
                {
                    "paperId": "c3",
                    "title": "Empty Link",
                    "openAccessPdf": {"url": ""}
                }
            ]
        });

        let papers = parse_search_response(&resp);
        assert_eq!(papers.len(), 1);
        let p = &papers[0];
        assert_eq!(p.title, "Attention Is All You Need");
        assert_eq!(p.authors, vec!["Ashish Vaswani".to_string(), "Noam Shazeer".to_string()]);
        assert_eq!(p.year, Some(2017));
        assert_eq!(p.source_url.as_deref(), Some("https://www.semanticscholar.org/paper/a1"));
        assert_eq!(p.pdf_url.as_deref(), Some("https://arxiv.org/pdf/1706.03762.pdf"));
        assert_eq!(p.full_text, "");
        assert_eq!(p.source, CatalogSource::SemanticScholar);
    }

    #[test]
    fn test_search_limit_is_capped_at_api_maximum() {
        assert_eq!(search_limit(3), 3);
        assert_eq!(search_limit(100), 100);
        assert_eq!(search_limit(250), 100);
    }

    #[test]
    fn test_parse_missing_data_is_empty() {
        let resp = serde_json::json!({"message": "Too Many Requests"});
        assert!(parse_search_response(&resp).is_empty());
    }
}
