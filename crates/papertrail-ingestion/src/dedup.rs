//! Title-based deduplication of merged catalog results.

use std::collections::HashSet;

use crate::models::PaperRecord;

/// Keep the first record for every normalised title, preserving order.
///
/// Titles are compared lower-cased and trimmed. Records with a blank title
/// are always kept and never count as duplicates of each other.
pub fn dedup_by_title(papers: Vec<PaperRecord>) -> Vec<PaperRecord> {
    let mut seen_titles = HashSet::new();
    papers
        .into_iter()
        .filter(|paper| match paper.dedup_key() {
            Some(key) => seen_titles.insert(key),
            None => true,
        })
        .collect()
}
