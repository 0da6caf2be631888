//! Embedding client: turns chunk texts and queries into L2-normalised vectors.
//!
//! Supports two backends:
//!   - Ollama         (`/api/embeddings`, one request per text)
//!   - OpenAI-compat  (any `/v1/embeddings` endpoint, batched)

use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument};

use papertrail_common::{PapertrailError, SandboxClient as Client};
use papertrail_config::{EmbeddingBackend, EmbeddingSettings};

use crate::error::{IngestionError, Result};

/// Anything that can map texts to fixed-dimension vectors.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// One vector per input text, in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    async fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[query.to_string()])
            .await?
            .pop()
            .ok_or_else(|| IngestionError::Embedding("backend returned no vector for query".to_string()))
    }

    /// Preferred number of texts per request.
    fn batch_size(&self) -> usize {
        32
    }
}

// ── Embedding client ──────────────────────────────────────────────────────────

pub struct EmbeddingClient {
    cfg: EmbeddingSettings,
    client: Client,
}

impl EmbeddingClient {
    pub fn new(cfg: EmbeddingSettings) -> std::result::Result<Self, PapertrailError> {
        let mut client = Client::new(Duration::from_secs(cfg.timeout_secs))?;
        let host = url::Url::parse(&cfg.base_url)
            .ok()
            .and_then(|u| u.host_str().map(String::from))
            .ok_or_else(|| PapertrailError::Config(format!("invalid embedding base_url: {}", cfg.base_url)))?;
        client.allow_domain(&host);
        Ok(Self { cfg, client })
    }

    fn base(&self) -> &str {
        self.cfg.base_url.trim_end_matches('/')
    }

    // ── Ollama ─────────────────────────────────────────────────────────────

    async fn embed_ollama(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        let url = format!("{}/api/embeddings", self.base());
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            let body = serde_json::json!({"model": &self.cfg.model, "prompt": text});
            let resp: serde_json::Value = self.client
                .post(&url)?
                .json(&body)
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;
            out.push(parse_vector(&resp["embedding"])?);
        }
        Ok(out)
    }

    // ── OpenAI-compatible ──────────────────────────────────────────────────

    async fn embed_compat(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        let url = format!("{}/v1/embeddings", self.base());
        let body = serde_json::json!({
            "model": &self.cfg.model,
            "input": texts,
        });
        let mut req = self.client.post(&url)?.json(&body);
        if let Some(ref k) = self.cfg.api_key {
            req = req.bearer_auth(k);
        }
        let resp: serde_json::Value = req.send().await?.error_for_status()?.json().await?;
        parse_openai_embeddings(&resp)
    }
}

#[async_trait]
impl Embedder for EmbeddingClient {
    #[instrument(skip(self, texts), fields(n = texts.len(), backend = ?self.cfg.backend))]
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }
        let raw = match self.cfg.backend {
            EmbeddingBackend::Ollama           => self.embed_ollama(texts).await,
            EmbeddingBackend::OpenAiCompatible => self.embed_compat(texts).await,
        }
        .map_err(|e| IngestionError::Embedding(format!("{e:#}")))?;

        if raw.len() != texts.len() {
            return Err(IngestionError::Embedding(format!(
                "expected {} vectors, backend returned {}",
                texts.len(),
                raw.len()
            )));
        }
        debug!(dim = raw.first().map(Vec::len).unwrap_or(0), "Batch embedded");
        Ok(raw.into_iter().map(normalize).collect())
    }

    fn batch_size(&self) -> usize {
        self.cfg.batch_size.max(1)
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn parse_vector(value: &serde_json::Value) -> anyhow::Result<Vec<f32>> {
    let arr = value
        .as_array()
        .ok_or_else(|| anyhow::anyhow!("embedding is not an array"))?;
    if arr.is_empty() {
        anyhow::bail!("embedding is empty");
    }
    Ok(arr.iter().map(|v| v.as_f64().unwrap_or(0.0) as f32).collect())
}

/// `{"data": [{"index": 0, "embedding": [...]}, ...]}` → vectors in index order.
fn parse_openai_embeddings(resp: &serde_json::Value) -> anyhow::Result<Vec<Vec<f32>>> {
    let data = resp["data"]
        .as_array()
        .ok_or_else(|| anyhow::anyhow!("missing 'data' in embeddings response"))?;
    let mut rows = data
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let index = item["index"].as_u64().map(|n| n as usize).unwrap_or(i);
            Ok((index, parse_vector(&item["embedding"])?))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;
    rows.sort_by_key(|(index, _)| *index);
    Ok(rows.into_iter().map(|(_, v)| v).collect())
}

fn l2_norm(v: &[f32]) -> f32 {
    let s: f32 = v.iter().map(|x| x * x).sum();
    s.sqrt().max(1e-10)
}

pub(crate) fn normalize(v: Vec<f32>) -> Vec<f32> {
    let norm = l2_norm(&v);
    v.into_iter().map(|x| x / norm).collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
