//! arXiv API client.
//!
//! Endpoint: https://export.arxiv.org/api/query (Atom feed)
//! Results are requested in relevance order; entries without a PDF link
//! are skipped.

use async_trait::async_trait;
use chrono::{DateTime, Datelike};
use papertrail_common::{PapertrailError, SandboxClient as Client};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::error::SourceUnavailable;
use crate::models::{CatalogSource, PaperRecord};
use super::{squash_whitespace, LiteratureSource};

const ARXIV_QUERY_URL: &str = "https://export.arxiv.org/api/query";

pub struct ArxivClient {
    client: Client,
}

impl ArxivClient {
    pub fn new(timeout: Duration) -> Result<Self, PapertrailError> {
        Ok(Self { client: Client::new(timeout)? })
    }

    #[instrument(skip(self))]
    async fn query(&self, query: &str, max_results: usize) -> anyhow::Result<Vec<PaperRecord>> {
        let search_query = format!("all:{query}");
        let max = max_results.to_string();
        let xml = self.client
            .get(ARXIV_QUERY_URL)?
            .query(&[
                ("search_query", search_query.as_str()),
                ("start",        "0"),
                ("max_results",  max.as_str()),
                ("sortBy",       "relevance"),
                ("sortOrder",    "descending"),
            ])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let papers = parse_atom_feed(&xml)?;
        debug!(kept = papers.len(), "arXiv search returned results");
        Ok(papers)
    }
}

#[async_trait]
impl LiteratureSource for ArxivClient {
    fn catalog(&self) -> CatalogSource {
        CatalogSource::Arxiv
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<PaperRecord>, SourceUnavailable> {
        self.query(query, max_results)
            .await
            .map_err(|e| SourceUnavailable::new(self.catalog(), format!("{e:#}")))
    }
}

// ── Atom parsing ──────────────────────────────────────────────────────────────

#[derive(Clone, Copy)]
enum Field {
    Title,
    Summary,
    Published,
    Id,
    AuthorName,
}

#[derive(Default)]
struct Entry {
    title: String,
    summary: String,
    published: String,
    id: String,
    authors: Vec<String>,
    pdf_url: Option<String>,
}

impl Entry {
    fn push_text(&mut self, field: Field, text: &str) {
        match field {
            Field::Title      => self.title.push_str(text),
            Field::Summary    => self.summary.push_str(text),
            Field::Published  => self.published.push_str(text),
            Field::Id         => self.id.push_str(text),
            Field::AuthorName => {
                if let Some(last) = self.authors.last_mut() {
                    last.push_str(text);
                }
            }
        }
    }

    fn read_link(&mut self, e: &BytesStart<'_>) -> anyhow::Result<()> {
        let mut title = None;
        let mut href = None;
        for attr in e.attributes().flatten() {
            match attr.key.as_ref() {
                b"title" => title = Some(attr.unescape_value()?.into_owned()),
                b"href"  => href = Some(attr.unescape_value()?.into_owned()),
                _ => {}
            }
        }
        if title.as_deref() == Some("pdf") {
            self.pdf_url = href.filter(|h| !h.trim().is_empty());
        }
        Ok(())
    }

    fn into_record(self) -> Option<PaperRecord> {
        let pdf_url = self.pdf_url?;
        let mut record = PaperRecord::new(CatalogSource::Arxiv, squash_whitespace(&self.title));
        let summary = squash_whitespace(&self.summary);
        record.abstract_text = (!summary.is_empty()).then_some(summary);
        record.authors = self.authors
            .iter()
            .map(|a| squash_whitespace(a))
            .filter(|a| !a.is_empty())
            .collect();
        record.year = parse_year(self.published.trim());
        record.source_url = Some(self.id.trim().to_string()).filter(|id| !id.is_empty());
        record.pdf_url = Some(pdf_url);
        Some(record)
    }
}

fn parse_year(published: &str) -> Option<i32> {
    DateTime::parse_from_rfc3339(published)
        .map(|d| d.year())
        .ok()
        .or_else(|| published.get(..4)?.parse().ok())
}

/// Parse an arXiv Atom response into paper records.
fn parse_atom_feed(xml: &str) -> anyhow::Result<Vec<PaperRecord>> {
    let mut papers = Vec::new();
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut current: Option<Entry> = None;
    let mut field: Option<Field> = None;
    let mut in_author = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                if let Some(entry) = current.as_mut() {
                    match e.name().as_ref() {
                        b"title"     => field = Some(Field::Title),
                        b"summary"   => field = Some(Field::Summary),
                        b"published" => field = Some(Field::Published),
                        b"id"        => field = Some(Field::Id),
                        b"author"    => in_author = true,
                        b"name" if in_author => {
                            entry.authors.push(String::new());
                            field = Some(Field::AuthorName);
                        }
                        b"link"      => entry.read_link(e)?,
                        _ => {}
                    }
                } else if e.name().as_ref() == b"entry" {
                    current = Some(Entry::default());
                }
            }
            Ok(Event::Empty(ref e)) => {
                if let Some(entry) = current.as_mut() {
                    if e.name().as_ref() == b"link" {
                        entry.read_link(e)?;
                    }
                }
            }
            Ok(Event::Text(ref e)) => {
                if let (Some(entry), Some(f)) = (current.as_mut(), field) {
                    entry.push_text(f, &e.unescape()?);
                }
            }
            Ok(Event::End(ref e)) => {
                match e.name().as_ref() {
                    b"entry" => {
                        if let Some(entry) = current.take() {
                            match entry.into_record() {
                                Some(record) => papers.push(record),
                                None => debug!("Skipping arXiv entry without PDF link"),
                            }
                        }
                        in_author = false;
                    }
                    b"author" => in_author = false,
                    _ => {}
                }
                field = None;
            }
            Ok(Event::Eof) => break,
            Err(e) => anyhow::bail!(
                "arXiv feed parse error at byte {}: {e}",
                reader.buffer_position()
            ),
            _ => {}
        }
        buf.clear();
    }

    Ok(papers)
}
