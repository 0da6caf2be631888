//! Google Scholar result-page client.
//!
//! Scholar has no API; result pages are fetched ten hits at a time and
//! scraped. Hits only carry a landing-page URL, which is mapped to a PDF
//! with [`pdf_url_for`]. Hits from unknown publishers are dropped.

use async_trait::async_trait;
use papertrail_common::{PapertrailError, SandboxClient as Client};
use reqwest::header::{ACCEPT_LANGUAGE, USER_AGENT};
use scraper::{ElementRef, Html, Selector};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::error::SourceUnavailable;
use crate::models::{CatalogSource, PaperRecord};
use super::pdf_url::pdf_url_for;
use super::{squash_whitespace, LiteratureSource};

const SCHOLAR_URL: &str = "https://scholar.google.com/scholar";
const PAGE_SIZE:   usize = 10;
// Scholar serves a consent page to non-browser agents.
const BROWSER_UA:  &str = "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0";

pub struct GoogleScholarClient {
    client: Client,
}

impl GoogleScholarClient {
    pub fn new(timeout: Duration) -> Result<Self, PapertrailError> {
        Ok(Self { client: Client::new(timeout)? })
    }

    #[instrument(skip(self))]
    async fn fetch_page(&self, query: &str, start: usize) -> anyhow::Result<String> {
        let start = start.to_string();
        let html = self.client
            .get(SCHOLAR_URL)?
            .header(USER_AGENT, BROWSER_UA)
            .header(ACCEPT_LANGUAGE, "en-US,en;q=0.8")
            .query(&[("q", query), ("start", start.as_str()), ("hl", "en")])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(html)
    }

    async fn collect(&self, query: &str, max_results: usize) -> anyhow::Result<Vec<PaperRecord>> {
        walk_pages(max_results, move |start| self.fetch_page(query, start)).await
    }
}

/// Walk result pages from offset 0 until `max_results` hits have been
/// inspected or a page has no hits. Unmappable hits still count as inspected.
async fn walk_pages<F, Fut>(max_results: usize, mut fetch_page: F) -> anyhow::Result<Vec<PaperRecord>>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = anyhow::Result<String>>,
{
    let mut papers = Vec::new();
    let mut inspected = 0;
    let mut start = 0;

    while inspected < max_results {
        let html = fetch_page(start).await?;
        let hits = parse_results_page(&html)?;
        if hits.is_empty() {
            break;
        }
        for hit in hits {
            if inspected >= max_results {
                break;
            }
            inspected += 1;
            match hit.into_record() {
                Some(record) => papers.push(record),
                None => debug!("Skipping Scholar hit with no known PDF mapping"),
            }
        }
        start += PAGE_SIZE;
    }

    debug!(inspected, kept = papers.len(), "Google Scholar search finished");
    Ok(papers)
}

#[async_trait]
impl LiteratureSource for GoogleScholarClient {
    fn catalog(&self) -> CatalogSource {
        CatalogSource::GoogleScholar
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<PaperRecord>, SourceUnavailable> {
        self.collect(query, max_results)
            .await
            .map_err(|e| SourceUnavailable::new(self.catalog(), format!("{e:#}")))
    }
}

// ── Page scraping ─────────────────────────────────────────────────────────────

/// One organic result on a Scholar page.
#[derive(Debug, Clone, PartialEq)]
struct ScholarHit {
    title: String,
    landing_url: Option<String>,
    byline: String,
    snippet: Option<String>,
}

impl ScholarHit {
    fn into_record(self) -> Option<PaperRecord> {
        let landing = self.landing_url?;
        let pdf_url = pdf_url_for(&landing)?;

        let mut record = PaperRecord::new(CatalogSource::GoogleScholar, self.title);
        record.abstract_text = self.snippet;
        record.authors = byline_authors(&self.byline);
        record.year = byline_year(&self.byline);
        record.source_url = Some(landing);
        record.pdf_url = Some(pdf_url);
        Some(record)
    }
}

fn selector(css: &str) -> anyhow::Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow::anyhow!("invalid selector {css:?}: {e:?}"))
}

fn element_text(el: ElementRef<'_>) -> String {
    squash_whitespace(&el.text().collect::<String>())
}

fn parse_results_page(html: &str) -> anyhow::Result<Vec<ScholarHit>> {
    let result_sel = selector("div.gs_ri")?;
    let title_sel  = selector("h3.gs_rt")?;
    let link_sel   = selector("h3.gs_rt a")?;
    let byline_sel = selector("div.gs_a")?;
    let snippet_sel = selector("div.gs_rs")?;

    let document = Html::parse_document(html);
    let hits = document
        .select(&result_sel)
        .filter_map(|result| {
            let link = result.select(&link_sel).next();
            let title = match link {
                Some(a) => element_text(a),
                None => strip_tags(&element_text(result.select(&title_sel).next()?)),
            };
            Some(ScholarHit {
                title,
                landing_url: link.and_then(|a| a.value().attr("href")).map(String::from),
                byline: result.select(&byline_sel).next().map(element_text).unwrap_or_default(),
                snippet: result
                    .select(&snippet_sel)
                    .next()
                    .map(element_text)
                    .filter(|s| !s.is_empty()),
            })
        })
        .collect();
    Ok(hits)
}

/// Drop leading `[PDF]`, `[CITATION]` style markers from unlinked titles.
fn strip_tags(title: &str) -> String {
    let mut rest = title.trim();
    while rest.starts_with('[') {
        match rest.find(']') {
            Some(end) => rest = rest[end + 1..].trim_start(),
            None => break,
        }
    }
    rest.to_string()
}

/// `"A Vaswani, N Shazeer… - Advances in neural…, 2017 - neurips.cc"` → authors.
fn byline_authors(byline: &str) -> Vec<String> {
    let authors = byline.split(" - ").next().unwrap_or("");
    authors
        .split(',')
        .map(|a| a.trim().trim_end_matches('…').trim())
        .filter(|a| !a.is_empty())
        .map(String::from)
        .collect()
}

/// Last plausible publication year in the byline.
fn byline_year(byline: &str) -> Option<i32> {
    byline
        .split(|c: char| !c.is_ascii_digit())
        .filter(|run| run.len() == 4)
        .filter_map(|run| run.parse::<i32>().ok())
        .filter(|y| (1900..=2099).contains(y))
        .last()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const PAGE: &str = r#"<html><body><div id="gs_res_ccl_mid">
      <div class="gs_r gs_or gs_scl"><div class="gs_ri">
        <h3 class="gs_rt"><a href="https://arxiv.org/abs/1706.03762">Attention is all you need</a></h3>
        <div class="gs_a">A Vaswani, N Shazeer, N Parmar… - Advances in neural …, 2017 - proceedings.neurips.cc</div>
        <div class="gs_rs">The dominant sequence transduction models are based on complex recurrent …</div>
      </div></div>
      <div class="gs_r gs_or gs_scl"><div class="gs_ri">
        <h3 class="gs_rt"><a href="https://www.nature.com/articles/nature14539">Deep learning</a></h3>
        <div class="gs_a">Y LeCun, Y Bengio, G Hinton - nature, 2015 - nature.com</div>
      </div></div>
      <div class="gs_r gs_or gs_scl"><div class="gs_ri">
        <h3 class="gs_rt"><span class="gs_ctg2">[CITATION]</span> Some citation only</h3>
        <div class="gs_a">J Doe - 1999</div>
      </div></div>
    </div></body></html>"#;

    #[test]
    fn test_parse_results_page() {
        let hits = parse_results_page(PAGE).unwrap();
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].title, "Attention is all you need");
        assert_eq!(hits[0].landing_url.as_deref(), Some("https://arxiv.org/abs/1706.03762"));
        assert_eq!(hits[2].title, "Some citation only");
        assert_eq!(hits[2].landing_url, None);
    }

    #[test]
    fn test_unmappable_hits_are_dropped() {
        let records: Vec<PaperRecord> = parse_results_page(PAGE)
            .unwrap()
            .into_iter()
            .filter_map(ScholarHit::into_record)
            .collect();
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.pdf_url.as_deref(), Some("https://arxiv.org/pdf/1706.03762.pdf"));
        assert_eq!(r.authors, vec!["A Vaswani", "N Shazeer", "N Parmar"]);
        assert_eq!(r.year, Some(2017));
        assert_eq!(r.source, CatalogSource::GoogleScholar);
    }

    #[test]
    fn test_byline_year_ignores_non_years() {
        assert_eq!(byline_year("X Y - Journal 1234, 2020 - site.org"), Some(2020));
        assert_eq!(byline_year("no year here"), None);
    }

    #[test]
    fn test_empty_page_has_no_hits() {
        assert!(parse_results_page("<html><body></body></html>").unwrap().is_empty());
    }

    /// A results page with one hit per landing URL.
    fn results_page(urls: &[String]) -> String {
        let hits: String = urls
            .iter()
            .enumerate()
            .map(|(i, url)| {
                format!(
                    r#"<div class="gs_r"><div class="gs_ri"><h3 class="gs_rt"><a href="{url}">Paper {i}</a></h3><div class="gs_a">A Author - Venue, 2021 - site.org</div></div></div>"#
                )
            })
            .collect();
        format!("<html><body>{hits}</body></html>")
    }

    /// `n` arXiv hits whose ids start at `first`.
    fn arxiv_page(first: usize, n: usize) -> String {
        let urls: Vec<String> = (first..first + n)
            .map(|i| format!("https://arxiv.org/abs/2101.{i:05}"))
            .collect();
        results_page(&urls)
    }

    /// Serves `pages[start / 10]` (empty past the end) and records each offset.
    async fn walk_canned(pages: &[String], max_results: usize) -> (Vec<PaperRecord>, Vec<usize>) {
        let mut offsets = Vec::new();
        let papers = walk_pages(max_results, |start| {
            offsets.push(start);
            let html = pages.get(start / PAGE_SIZE).cloned().unwrap_or_default();
            async move { Ok(html) }
        })
        .await
        .unwrap();
        (papers, offsets)
    }

    #[tokio::test]
    async fn test_walk_stops_mid_page_at_max_results() {
        let (papers, offsets) = walk_canned(&[arxiv_page(0, 10)], 3).await;
        assert_eq!(offsets, vec![0]);
        assert_eq!(papers.len(), 3);
        assert_eq!(papers[2].pdf_url.as_deref(), Some("https://arxiv.org/pdf/2101.00002.pdf"));
    }

    #[tokio::test]
    async fn test_walk_advances_ten_hits_per_page() {
        let pages = [arxiv_page(0, 10), arxiv_page(10, 10), arxiv_page(20, 10)];
        let (papers, offsets) = walk_canned(&pages, 15).await;
        assert_eq!(offsets, vec![0, 10]);
        assert_eq!(papers.len(), 15);
        assert_eq!(papers[14].pdf_url.as_deref(), Some("https://arxiv.org/pdf/2101.00014.pdf"));
    }

    #[tokio::test]
    async fn test_walk_stops_on_empty_page() {
        let pages = [arxiv_page(0, 10), results_page(&[])];
        let (papers, offsets) = walk_canned(&pages, 50).await;
        assert_eq!(offsets, vec![0, 10]);
        assert_eq!(papers.len(), 10);
    }

    #[tokio::test]
    async fn test_unmappable_hits_count_as_inspected() {
        let page = results_page(&[
            "https://www.nature.com/articles/nature14539".to_string(),
            "https://arxiv.org/abs/2101.00001".to_string(),
            "https://arxiv.org/abs/2101.00002".to_string(),
        ]);
        let (papers, offsets) = walk_canned(&[page], 2).await;
        assert_eq!(offsets, vec![0]);
        assert_eq!(papers.len(), 1);
        assert_eq!(papers[0].title, "Paper 1");
    }

    #[tokio::test]
    async fn test_failed_page_fails_the_walk() {
        let result = walk_pages(20, |start| async move {
            if start == 0 { Ok(arxiv_page(0, 10)) } else { Err(anyhow::anyhow!("HTTP 429")) }
        })
        .await;
        assert!(result.is_err());
    }
}
