//! Recursive separator-based chunker.
//!
//! Text is split on the highest-priority separator that occurs in it, the
//! pieces are merged greedily up to `chunk_size` characters with a trailing
//! overlap carried into the next chunk, and pieces that are still too long
//! are split again with the remaining separators. When no separator is left
//! the text is cut into fixed character windows.

use std::collections::VecDeque;
use tracing::{debug, warn};

use papertrail_config::{ConfigError, ProcessingConfig, Separator};

use crate::models::{Chunk, PaperRecord};

#[derive(Debug, Clone)]
pub struct RecursiveSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<Separator>,
}

impl RecursiveSplitter {
    pub fn new(chunk_size: usize, chunk_overlap: usize, separators: Vec<Separator>) -> Self {
        let chunk_size = chunk_size.max(1);
        let chunk_overlap = if chunk_overlap >= chunk_size {
            warn!(chunk_size, chunk_overlap, "chunk_overlap must be below chunk_size, using half");
            chunk_size / 2
        } else {
            chunk_overlap
        };
        Self { chunk_size, chunk_overlap, separators }
    }

    pub fn from_config(cfg: &ProcessingConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(cfg.chunk_size, cfg.chunk_overlap, cfg.compiled_separators()?))
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Split `text` into trimmed, non-empty chunks of at most `chunk_size` chars.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_with(text, &self.separators)
    }

    fn split_with(&self, text: &str, separators: &[Separator]) -> Vec<String> {
        let Some(idx) = separators.iter().position(|s| s.occurs_in(text)) else {
            return self.hard_cut(text);
        };
        let remaining = &separators[idx + 1..];

        let mut chunks = Vec::new();
        let mut fitting: Vec<&str> = Vec::new();
        for piece in split_keeping_separator(text, &separators[idx]) {
            if char_len(piece) <= self.chunk_size {
                fitting.push(piece);
            } else {
                if !fitting.is_empty() {
                    chunks.extend(self.merge(&fitting));
                    fitting.clear();
                }
                chunks.extend(self.split_with(piece, remaining));
            }
        }
        if !fitting.is_empty() {
            chunks.extend(self.merge(&fitting));
        }
        chunks
    }

    /// Greedy merge of pieces that each fit, carrying up to `chunk_overlap`
    /// characters of trailing pieces into the next chunk.
    fn merge(&self, pieces: &[&str]) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut window: VecDeque<(&str, usize)> = VecDeque::new();
        let mut total = 0;

        for &piece in pieces {
            let len = char_len(piece);
            if total + len > self.chunk_size && !window.is_empty() {
                push_trimmed(&mut chunks, window.iter().map(|(p, _)| *p).collect());
                while total > self.chunk_overlap || (total > 0 && total + len > self.chunk_size) {
                    match window.pop_front() {
                        Some((_, l)) => total -= l,
                        None => break,
                    }
                }
            }
            window.push_back((piece, len));
            total += len;
        }
        if !window.is_empty() {
            push_trimmed(&mut chunks, window.iter().map(|(p, _)| *p).collect());
        }
        chunks
    }

    /// Fixed windows of `chunk_size` chars advancing by `chunk_size - chunk_overlap`.
    fn hard_cut(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        let stride = (self.chunk_size - self.chunk_overlap).max(1);

        let mut chunks = Vec::new();
        let mut start = 0;
        while start < chars.len() {
            let end = (start + self.chunk_size).min(chars.len());
            push_trimmed(&mut chunks, chars[start..end].iter().collect());
            if end == chars.len() {
                break;
            }
            start += stride;
        }
        chunks
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn push_trimmed(chunks: &mut Vec<String>, chunk: String) {
    let trimmed = chunk.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

/// Split after every separator match; the match stays on the preceding piece.
fn split_keeping_separator<'a>(text: &'a str, separator: &Separator) -> Vec<&'a str> {
    let mut pieces = Vec::new();
    let mut start = 0;
    for (_, end) in separator.matches(text) {
        if end > start {
            pieces.push(&text[start..end]);
            start = end;
        }
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }
    pieces
}

/// Chunk every paper's full text, tagging chunks with paper metadata and a
/// 1-based `"i/n"` position.
pub fn build_chunks(papers: &[PaperRecord], splitter: &RecursiveSplitter) -> Vec<Chunk> {
    let mut chunks = Vec::new();

    for paper in papers {
        if paper.full_text.trim().is_empty() {
            warn!(title = %paper.title, "Skipping paper with no extracted text");
            continue;
        }

        let pieces = splitter.split_text(&paper.full_text);
        if pieces.is_empty() {
            warn!(title = %paper.title, "Paper produced no chunks, skipping");
            continue;
        }

        let n = pieces.len();
        debug!(title = %paper.title, n, "Chunked paper");
        let authors = paper.authors_joined();
        let year = paper.year_label();
        chunks.extend(pieces.into_iter().enumerate().map(|(i, content)| Chunk {
            content,
            paper_title: paper.title.clone(),
            authors_joined: authors.clone(),
            year: year.clone(),
            position: format!("{}/{}", i + 1, n),
        }));
    }

    chunks
}

/// Rough token estimation: words / 0.75 (WordPiece averages ~1.3 tokens/word).
pub fn estimate_tokens(text: &str) -> usize {
    let words = text.split_whitespace().count();
    ((words as f32) / 0.75).ceil() as usize
}
