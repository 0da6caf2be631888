//! Literature review over the semantic index.
//!
//! Retrieves the closest chunks for a question, packs them into a context
//! block and asks the LLM to answer from that context only.

use std::collections::BTreeSet;
use tracing::{debug, info};

use papertrail_config::{LlmSettings, ProcessingConfig};
use papertrail_ingestion::chunker::estimate_tokens;
use papertrail_ingestion::index::{ScoredChunk, SemanticIndex};
use papertrail_llm::LlmBackend;

#[derive(Debug, Clone, PartialEq)]
pub struct ReviewOutcome {
    pub answer: String,
    /// Distinct `"<title> (<year>)"` labels of the chunks used, sorted.
    pub sources: Vec<String>,
    pub num_ctx_used: usize,
}

pub struct ReviewerAgent<'a> {
    index: &'a SemanticIndex,
    llm: &'a dyn LlmBackend,
    retrieval_k: usize,
    answer_buffer: usize,
    max_ctx: usize,
}

impl<'a> ReviewerAgent<'a> {
    pub fn new(
        index: &'a SemanticIndex,
        llm: &'a dyn LlmBackend,
        processing: &ProcessingConfig,
        settings: &LlmSettings,
    ) -> Self {
        Self {
            index,
            llm,
            retrieval_k: processing.retrieval_k,
            answer_buffer: settings.answer_buffer,
            max_ctx: settings.num_ctx.min(llm.max_context_tokens()),
        }
    }

    pub async fn review(&self, question: &str) -> anyhow::Result<ReviewOutcome> {
        let hits = self.index.search(question, self.retrieval_k).await?;
        let context = build_context(&hits);
        let num_ctx = context_window(&context, question, self.answer_buffer, self.max_ctx);
        info!(hits = hits.len(), num_ctx, model = self.llm.model_id(), "Reviewing literature");

        let answer = self.llm.infer(&build_prompt(question, &context), num_ctx).await?;
        debug!(answer_len = answer.len(), "Review answer received");

        Ok(ReviewOutcome { answer, sources: source_labels(&hits), num_ctx_used: num_ctx })
    }
}

pub fn build_context(hits: &[ScoredChunk]) -> String {
    hits.iter()
        .map(|h| format!("Paper Title : {} \n Content : {}", h.chunk.paper_title, h.chunk.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Prompt tokens plus the answer buffer, capped at the model maximum.
pub fn context_window(context: &str, question: &str, answer_buffer: usize, max_ctx: usize) -> usize {
    let tokens = estimate_tokens(&format!("{context}{question}"));
    (tokens + answer_buffer).min(max_ctx)
}

pub fn build_prompt(question: &str, context: &str) -> String {
    format!(
        "Answer this research question using ONLY the provided context.\n\
         Cite sources as [Title, Page X].\n\n\
         Question: {question}\n\n\
         Context:\n{context}\n"
    )
}

fn source_labels(hits: &[ScoredChunk]) -> Vec<String> {
    hits.iter()
        .map(|h| format!("{} ({})", h.chunk.paper_title, h.chunk.year))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
