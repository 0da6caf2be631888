//! Full-text PDF download and extraction.
//!
//! Documents are fetched with a bounded timeout, parsed with lopdf on a
//! blocking worker, and flattened to plain text one page per line block.
//! Every failure degrades to an empty string.

use async_trait::async_trait;
use papertrail_common::{PapertrailError, SandboxClient as Client};
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Turns a document URL into plain text.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Extract the text behind `pdf_url`; `""` when anything goes wrong.
    async fn extract(&self, pdf_url: &str) -> String;
}

pub struct PdfExtractor {
    client: Client,
}

impl PdfExtractor {
    /// PDF links point at arbitrary publisher hosts, so the client is open.
    pub fn new(timeout: Duration) -> Result<Self, PapertrailError> {
        Ok(Self { client: Client::open(timeout)? })
    }

    #[instrument(skip(self))]
    async fn download_and_parse(&self, pdf_url: &str) -> anyhow::Result<String> {
        let resp = self.client.get(pdf_url)?.send().await?;
        if !resp.status().is_success() {
            anyhow::bail!("PDF download failed: HTTP {}", resp.status());
        }
        let pdf_bytes = resp.bytes().await?;
        debug!(bytes = pdf_bytes.len(), "PDF downloaded");

        let text = tokio::task::spawn_blocking(move || extract_text_from_bytes(&pdf_bytes)).await??;
        Ok(text)
    }
}

#[async_trait]
impl TextExtractor for PdfExtractor {
    async fn extract(&self, pdf_url: &str) -> String {
        match self.download_and_parse(pdf_url).await {
            Ok(text) => text,
            Err(e) => {
                warn!(pdf_url, error = %format!("{e:#}"), "PDF extraction failed, using empty text");
                String::new()
            }
        }
    }
}

/// Parse an in-memory PDF and join per-page text, in page order, with `\n`.
///
/// A page whose content cannot be decoded contributes an empty string;
/// a document that cannot be loaded at all is an error.
pub fn extract_text_from_bytes(bytes: &[u8]) -> anyhow::Result<String> {
    let pdf = lopdf::Document::load_mem(bytes)?;

    let pages: Vec<String> = pdf
        .get_pages()
        .keys()
        .map(|&page_num| match pdf.extract_text(&[page_num]) {
            Ok(text) => text.trim_end_matches('\n').to_string(),
            Err(e) => {
                debug!(page_num, error = %e, "Page text extraction failed");
                String::new()
            }
        })
        .collect();

    Ok(pages.join("\n"))
}
