//! Multi-source retrieval pipeline.
//!
//! Orchestrates the flow for a single research query:
//!   1. Query catalogs one at a time in priority order
//!      (Semantic Scholar → arXiv → Google Scholar), consulting the next
//!      catalog only while the raw result count is below `max_results`
//!   2. Deduplicate by normalised title, first-seen wins
//!   3. Download and extract full text for every survivor with a PDF URL
//!
//! Catalog and download failures are logged here and never abort the run.

use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use papertrail_common::PapertrailError;
use papertrail_config::SourcesConfig;

use crate::dedup::dedup_by_title;
use crate::error::SourceUnavailable;
use crate::models::{CatalogSource, PaperRecord};
use crate::pdf_parser::{PdfExtractor, TextExtractor};
use crate::sources::{ArxivClient, GoogleScholarClient, LiteratureSource, SemanticScholarClient};

// ── Result summary ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct SourceCount {
    pub catalog: CatalogSource,
    pub papers: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RetrievalReport {
    pub run_id: Uuid,
    pub query: String,
    /// Deduplicated records with `full_text` populated.
    pub papers: Vec<PaperRecord>,
    /// Raw contribution of every catalog that was consulted, in call order.
    pub per_source: Vec<SourceCount>,
    #[serde(skip)]
    pub failures: Vec<SourceUnavailable>,
    pub papers_found: usize,
    pub papers_duplicate: usize,
    pub papers_with_text: usize,
    pub duration_ms: u64,
}

// ── Pipeline orchestrator ─────────────────────────────────────────────────────

pub struct RetrievalPipeline {
    /// Catalogs in priority order.
    sources: Vec<Box<dyn LiteratureSource>>,
    extractor: Box<dyn TextExtractor>,
}

impl RetrievalPipeline {
    pub fn new(sources: Vec<Box<dyn LiteratureSource>>, extractor: Box<dyn TextExtractor>) -> Self {
        Self { sources, extractor }
    }

    /// The standard Semantic Scholar → arXiv → Google Scholar cascade.
    pub fn from_config(cfg: &SourcesConfig) -> Result<Self, PapertrailError> {
        let catalog_timeout = Duration::from_secs(cfg.catalog_timeout_secs);
        let sources: Vec<Box<dyn LiteratureSource>> = vec![
            Box::new(SemanticScholarClient::new(cfg.semantic_scholar_api_key.clone(), catalog_timeout)?),
            Box::new(ArxivClient::new(catalog_timeout)?),
            Box::new(GoogleScholarClient::new(catalog_timeout)?),
        ];
        let extractor = PdfExtractor::new(Duration::from_secs(cfg.pdf_timeout_secs))?;
        Ok(Self::new(sources, Box::new(extractor)))
    }

    /// Retrieve, deduplicate and extract; returns only the records.
    pub async fn fetch_papers(&self, query: &str, max_results: usize) -> Vec<PaperRecord> {
        self.run(query, max_results).await.papers
    }

    /// Runs the full retrieval flow for one query.
    ///
    /// `max_results` only decides whether lower-priority catalogs are
    /// consulted; the merged list is not truncated to it.
    #[instrument(skip(self))]
    pub async fn run(&self, query: &str, max_results: usize) -> RetrievalReport {
        let run_id = Uuid::new_v4();
        let t0 = Instant::now();
        info!(run_id = %run_id, query, max_results, "Starting retrieval");

        // ── 1. Cascade through catalogs ───────────────────────────────────────
        let mut all_papers = Vec::new();
        let mut per_source = Vec::new();
        let mut failures = Vec::new();

        for (i, source) in self.sources.iter().enumerate() {
            if i > 0 && all_papers.len() >= max_results {
                debug!(
                    catalog = %source.catalog(),
                    have = all_papers.len(),
                    "Enough results, skipping remaining catalogs"
                );
                break;
            }

            match source.search(query, max_results).await {
                Ok(papers) => {
                    info!(catalog = %source.catalog(), n = papers.len(), "Papers retrieved");
                    per_source.push(SourceCount { catalog: source.catalog(), papers: papers.len() });
                    all_papers.extend(papers);
                }
                Err(e) => {
                    warn!(catalog = %e.catalog, reason = %e.reason, "Catalog unavailable, continuing");
                    per_source.push(SourceCount { catalog: source.catalog(), papers: 0 });
                    failures.push(e);
                }
            }
        }

        // ── 2. Deduplicate ────────────────────────────────────────────────────
        let papers_found = all_papers.len();
        let mut papers = dedup_by_title(all_papers);
        let papers_duplicate = papers_found - papers.len();
        debug!(papers_found, papers_duplicate, "Deduplicated by title");

        // ── 3. Full-text extraction ───────────────────────────────────────────
        for paper in papers.iter_mut() {
            let full_text = match paper.pdf_url() {
                Some(url) => self.extractor.extract(url).await,
                None => String::new(),
            };
            paper.full_text = full_text;
        }
        let papers_with_text = papers.iter().filter(|p| !p.full_text.trim().is_empty()).count();

        let report = RetrievalReport {
            run_id,
            query: query.to_string(),
            papers,
            per_source,
            failures,
            papers_found,
            papers_duplicate,
            papers_with_text,
            duration_ms: t0.elapsed().as_millis() as u64,
        };

        info!(
            run_id           = %run_id,
            papers_found     = report.papers_found,
            papers_unique    = report.papers.len(),
            papers_with_text = report.papers_with_text,
            failures         = report.failures.len(),
            duration_ms      = report.duration_ms,
            "Retrieval complete"
        );

        report
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct FakeSource {
        catalog: CatalogSource,
        result: Result<Vec<PaperRecord>, String>,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl LiteratureSource for FakeSource {
        fn catalog(&self) -> CatalogSource {
            self.catalog
        }

        async fn search(&self, _query: &str, _max: usize) -> Result<Vec<PaperRecord>, SourceUnavailable> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result
                .clone()
                .map_err(|reason| SourceUnavailable::new(self.catalog, reason))
        }
    }

    struct FakeExtractor {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl TextExtractor for FakeExtractor {
        async fn extract(&self, pdf_url: &str) -> String {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if pdf_url.contains("broken") {
                String::new()
            } else {
                format!("full text of {pdf_url}")
            }
        }
    }

    fn record(catalog: CatalogSource, title: &str, pdf: Option<&str>) -> PaperRecord {
        let mut p = PaperRecord::new(catalog, title);
        p.pdf_url = pdf.map(String::from);
        p
    }

    fn records(catalog: CatalogSource, n: usize) -> Vec<PaperRecord> {
        (0..n)
            .map(|i| {
                record(catalog, &format!("{catalog} paper {i}"), Some(&format!("https://x.org/{catalog}/{i}.pdf")))
            })
            .collect()
    }

    struct Harness {
        pipeline: RetrievalPipeline,
        calls: [Arc<AtomicUsize>; 3],
        extract_calls: Arc<AtomicUsize>,
    }

    fn harness(
        a: Result<Vec<PaperRecord>, String>,
        b: Result<Vec<PaperRecord>, String>,
        c: Result<Vec<PaperRecord>, String>,
    ) -> Harness {
        let calls = [
            Arc::new(AtomicUsize::new(0)),
            Arc::new(AtomicUsize::new(0)),
            Arc::new(AtomicUsize::new(0)),
        ];
        let catalogs = [CatalogSource::SemanticScholar, CatalogSource::Arxiv, CatalogSource::GoogleScholar];
        let sources: Vec<Box<dyn LiteratureSource>> = [a, b, c]
            .into_iter()
            .zip(catalogs)
            .zip(calls.iter())
            .map(|((result, catalog), calls)| {
                Box::new(FakeSource { catalog, result, calls: calls.clone() }) as Box<dyn LiteratureSource>
            })
            .collect();
        let extract_calls = Arc::new(AtomicUsize::new(0));
        let extractor = Box::new(FakeExtractor { calls: extract_calls.clone() });
        Harness { pipeline: RetrievalPipeline::new(sources, extractor), calls, extract_calls }
    }

    fn call_counts(h: &Harness) -> [usize; 3] {
        [
            h.calls[0].load(Ordering::SeqCst),
            h.calls[1].load(Ordering::SeqCst),
            h.calls[2].load(Ordering::SeqCst),
        ]
    }

    #[tokio::test]
    async fn test_sufficient_first_catalog_skips_the_rest() {
        let h = harness(
            Ok(records(CatalogSource::SemanticScholar, 5)),
            Ok(records(CatalogSource::Arxiv, 5)),
            Ok(records(CatalogSource::GoogleScholar, 5)),
        );
        let papers = h.pipeline.fetch_papers("cnn face detection", 3).await;
        assert_eq!(call_counts(&h), [1, 0, 0]);
        assert!(papers.iter().all(|p| p.source == CatalogSource::SemanticScholar));
        assert_eq!(papers[0].title, "semantic_scholar paper 0");
        assert_eq!(papers[1].title, "semantic_scholar paper 1");
        assert_eq!(papers[2].title, "semantic_scholar paper 2");
    }

    #[tokio::test]
    async fn test_second_catalog_fills_shortfall() {
        let h = harness(
            Ok(records(CatalogSource::SemanticScholar, 1)),
            Ok(records(CatalogSource::Arxiv, 2)),
            Ok(records(CatalogSource::GoogleScholar, 5)),
        );
        let report = h.pipeline.run("q", 3).await;
        assert_eq!(call_counts(&h), [1, 1, 0]);
        assert_eq!(report.papers.len(), 3);
        assert_eq!(report.per_source.len(), 2);
    }

    #[tokio::test]
    async fn test_second_catalog_may_overshoot_cap() {
        let h = harness(
            Ok(records(CatalogSource::SemanticScholar, 1)),
            Ok(records(CatalogSource::Arxiv, 5)),
            Ok(vec![]),
        );
        let papers = h.pipeline.fetch_papers("q", 3).await;
        assert_eq!(call_counts(&h), [1, 1, 0]);
        assert_eq!(papers.len(), 6);
    }

    #[tokio::test]
    async fn test_all_catalogs_consulted_when_short() {
        let h = harness(Ok(vec![]), Ok(records(CatalogSource::Arxiv, 1)), Ok(records(CatalogSource::GoogleScholar, 1)));
        let papers = h.pipeline.fetch_papers("q", 3).await;
        assert_eq!(call_counts(&h), [1, 1, 1]);
        assert_eq!(papers.len(), 2);
    }

    #[tokio::test]
    async fn test_failing_catalog_is_absorbed() {
        let h = harness(
            Err("HTTP 429".to_string()),
            Ok(records(CatalogSource::Arxiv, 3)),
            Ok(records(CatalogSource::GoogleScholar, 3)),
        );
        let report = h.pipeline.run("q", 3).await;
        assert_eq!(call_counts(&h), [1, 1, 0]);
        assert_eq!(report.papers.len(), 3);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].catalog, CatalogSource::SemanticScholar);
    }

    #[tokio::test]
    async fn test_duplicates_across_catalogs_keep_first_seen() {
        let h = harness(
            Ok(vec![record(CatalogSource::SemanticScholar, "Deep Learning", Some("https://a.org/1.pdf"))]),
            Ok(vec![record(CatalogSource::Arxiv, "deep learning ", Some("https://b.org/1.pdf"))]),
            Ok(vec![]),
        );
        let report = h.pipeline.run("q", 3).await;
        assert_eq!(report.papers.len(), 1);
        assert_eq!(report.papers[0].source, CatalogSource::SemanticScholar);
        assert_eq!(report.papers_duplicate, 1);
        assert_eq!(h.extract_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_records_without_pdf_have_empty_text() {
        let h = harness(
            Ok(vec![
                record(CatalogSource::SemanticScholar, "With PDF", Some("https://a.org/1.pdf")),
                record(CatalogSource::SemanticScholar, "Without PDF", None),
                record(CatalogSource::SemanticScholar, "Blank PDF", Some("")),
                record(CatalogSource::SemanticScholar, "Broken PDF", Some("https://a.org/broken.pdf")),
            ]),
            Ok(vec![]),
            Ok(vec![]),
        );
        let report = h.pipeline.run("q", 1).await;
        for p in &report.papers {
            if p.pdf_url().is_none() {
                assert_eq!(p.full_text, "", "{} should have no text", p.title);
            }
        }
        assert_eq!(report.papers[0].full_text, "full text of https://a.org/1.pdf");
        assert_eq!(report.papers[3].full_text, "");
        assert_eq!(report.papers_with_text, 1);
        assert_eq!(h.extract_calls.load(Ordering::SeqCst), 2);
    }
}
