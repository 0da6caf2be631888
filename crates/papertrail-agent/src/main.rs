//! Papertrail — academic paper retrieval and literature review assistant.
//! Entry point for the agent binary.

mod review;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use papertrail_config::{Config, ConfigError};
use papertrail_ingestion::embedding::EmbeddingClient;
use papertrail_ingestion::index::{IndexConfig, SemanticIndex};
use papertrail_ingestion::pipeline::RetrievalPipeline;
use papertrail_ingestion::IngestionError;
use papertrail_llm::OllamaBackend;

use review::ReviewerAgent;

#[derive(Parser, Debug)]
#[command(
    name = "papertrail",
    version,
    about = "Retrieve open-access papers for a question, index their full text and review them"
)]
struct Args {
    /// Research question
    question: String,

    /// Number of papers to aim for across catalogs
    #[arg(long)]
    max_papers: Option<usize>,

    /// Path to a TOML or YAML config file (default: $PAPERTRAIL_CONFIG or ./papertrail.toml)
    #[arg(long)]
    config: Option<String>,

    /// Stop after indexing (skip the LLM review)
    #[arg(long, default_value_t = false)]
    no_review: bool,
}

fn load_config(args: &Args) -> anyhow::Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::from_path(path)?,
        None => match Config::load() {
            Ok(c) => c,
            Err(ConfigError::NotFound(path)) => {
                warn!("No {path} found, using built-in defaults");
                Config::default()
            }
            Err(e) => return Err(e.into()),
        },
    };
    if let Some(n) = args.max_papers {
        config.processing.max_papers = n;
    }
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("papertrail=debug,info")),
        )
        .init();

    let args = Args::parse();
    info!("Papertrail {} starting", env!("CARGO_PKG_VERSION"));

    let config = load_config(&args)?;
    info!(
        max_papers = config.processing.max_papers,
        chunk_size = config.processing.chunk_size,
        chunk_overlap = config.processing.chunk_overlap,
        "Configuration loaded"
    );

    // 1. Retrieve papers
    let pipeline = RetrievalPipeline::from_config(&config.sources)?;
    let report = pipeline.run(&args.question, config.processing.max_papers).await;
    if report.papers.is_empty() {
        return Err(IngestionError::NoPapersFound { query: args.question.clone() }.into());
    }

    println!("Retrieved {} papers:", report.papers.len());
    for p in &report.papers {
        println!("  {} ({}) - {}", p.title, p.year_label(), p.pdf_url().unwrap_or(""));
    }

    // 2. Index papers
    let index_cfg = IndexConfig::from_processing(&config.processing)?;
    let embedder = Arc::new(EmbeddingClient::new(config.embedding.clone())?);
    let index = match SemanticIndex::build(&report.papers, &index_cfg, embedder).await {
        Ok(index) => index,
        Err(e @ IngestionError::EmptyCorpus { .. }) => {
            return Err(anyhow::Error::new(e).context("papers were found but no full text could be extracted"));
        }
        Err(e) => return Err(e).context("indexing failed"),
    };
    println!("Indexed {} chunks.", index.len());

    if args.no_review {
        return Ok(());
    }

    // 3. Literature review
    let llm = OllamaBackend::new(&config.llm)?;
    let reviewer = ReviewerAgent::new(&index, &llm, &config.processing, &config.llm);
    let outcome = reviewer.review(&args.question).await?;

    println!("\nLiterature Review\n\n{}", outcome.answer);
    println!("\nSources:");
    for source in &outcome.sources {
        println!("  {source}");
    }
    info!(num_ctx = outcome.num_ctx_used, "Review complete");

    Ok(())
}
