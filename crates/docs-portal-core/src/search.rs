//! Substring search over published documents.
//!
//! The ranker operates entirely through the [`Store`] trait. It scans every
//! published document that has content, in the store's natural order, and
//! scores case-insensitive substring matches:
//!
//! | Match | Score |
//! |-------|-------|
//! | query in title | +10 |
//! | query in content | +5 |
//!
//! Documents matching neither are dropped. Results are sorted by score
//! descending with a stable sort, so equal scores keep store order, and the
//! ranked list is truncated to `max_results`.
//!
//! # Excerpts
//!
//! When the content matches, the excerpt is a window from 50 characters
//! before the first match to 100 characters after its end, with `...`
//! marking a cut on either side. For title-only matches the excerpt is the
//! first 150 characters of the content. All offsets count characters, not
//! bytes.

use anyhow::Result;
use tracing::debug;

use crate::folders::FolderPaths;
use crate::models::{Document, SearchResult};
use crate::store::{DocumentOrder, Store};

/// Default cap on the number of ranked results.
pub const DEFAULT_MAX_RESULTS: usize = 20;

const TITLE_SCORE: i64 = 10;
const CONTENT_SCORE: i64 = 5;
const EXCERPT_BEFORE: usize = 50;
const EXCERPT_AFTER: usize = 100;
const PREVIEW_CHARS: usize = 150;
const ELLIPSIS: &str = "...";

/// Rank published documents against `query`.
///
/// An empty or whitespace-only query returns no results without touching
/// the store.
pub async fn search<S: Store + ?Sized>(
    store: &S,
    query: &str,
    max_results: usize,
) -> Result<Vec<SearchResult>> {
    let query = query.trim();
    if query.is_empty() {
        return Ok(Vec::new());
    }

    let needle = fold_case(query);
    let query_chars = query.chars().count();

    let docs = store.all_published(DocumentOrder::Natural).await?;
    let scored: Vec<(&Document, i64, String)> = docs
        .iter()
        .filter_map(|doc| score_document(doc, &needle, query_chars).map(|(s, e)| (doc, s, e)))
        .collect();

    if scored.is_empty() {
        return Ok(Vec::new());
    }

    let folders = store.list_folders().await?;
    let paths = FolderPaths::new(&folders);

    let mut results: Vec<SearchResult> = scored
        .into_iter()
        .map(|(doc, match_score, excerpt)| SearchResult {
            id: doc.id.clone(),
            title: doc.title.clone(),
            slug: doc.slug.clone(),
            folder: doc
                .folder_id
                .as_deref()
                .and_then(|id| paths.slug_of(id))
                .unwrap_or_default()
                .to_string(),
            excerpt,
            match_score,
        })
        .collect();

    // Vec::sort_by is stable: equal scores keep store order.
    results.sort_by(|a, b| b.match_score.cmp(&a.match_score));
    let matched = results.len();
    results.truncate(max_results);

    debug!(query, matched, returned = results.len(), "search complete");
    Ok(results)
}

/// Score one document; `None` when neither title nor content matches or
/// the document has no content.
fn score_document(doc: &Document, needle: &str, query_chars: usize) -> Option<(i64, String)> {
    let content = doc.content.as_deref()?;

    let title_match = fold_case(&doc.title).contains(needle);
    let content_match = find_case_insensitive(content, needle);

    let mut score = 0;
    if title_match {
        score += TITLE_SCORE;
    }
    if content_match.is_some() {
        score += CONTENT_SCORE;
    }
    if score == 0 {
        return None;
    }

    let excerpt = match content_match {
        Some(index) => excerpt_around(content, index, query_chars),
        None => preview(content),
    };
    Some((score, excerpt))
}

/// Lowercase one char at a time, the same folding [`find_case_insensitive`]
/// applies to the haystack. `str::to_lowercase` is context sensitive (a
/// word-final `Σ` becomes `ς`), so it cannot be mixed with this.
pub fn fold_case(text: &str) -> String {
    text.chars().flat_map(char::to_lowercase).collect()
}

/// Character index of the first case-insensitive occurrence of
/// `needle_lower` (already passed through [`fold_case`]) in `haystack`.
pub fn find_case_insensitive(haystack: &str, needle_lower: &str) -> Option<usize> {
    // Lowercasing can change the byte length of a character, so keep a map
    // from each lowered character's byte offset to its source char index.
    let mut lowered = String::with_capacity(haystack.len());
    let mut starts: Vec<(usize, usize)> = Vec::with_capacity(haystack.len());
    for (char_idx, c) in haystack.chars().enumerate() {
        for lc in c.to_lowercase() {
            starts.push((lowered.len(), char_idx));
            lowered.push(lc);
        }
    }

    let byte = lowered.find(needle_lower)?;
    let pos = starts.partition_point(|(offset, _)| *offset <= byte);
    starts.get(pos.checked_sub(1)?).map(|(_, char_idx)| *char_idx)
}

/// Window around a match at char index `index` spanning `query_chars` chars.
pub fn excerpt_around(content: &str, index: usize, query_chars: usize) -> String {
    let len = content.chars().count();
    let start = index.saturating_sub(EXCERPT_BEFORE);
    let end = (index + query_chars + EXCERPT_AFTER).min(len);

    let mut out = String::new();
    if start > 0 {
        out.push_str(ELLIPSIS);
    }
    out.push_str(char_slice(content, start, end));
    if end < len {
        out.push_str(ELLIPSIS);
    }
    out
}

/// First 150 characters of `content`, with `...` when truncated.
pub fn preview(content: &str) -> String {
    let len = content.chars().count();
    let mut out = char_slice(content, 0, PREVIEW_CHARS).to_string();
    if len > PREVIEW_CHARS {
        out.push_str(ELLIPSIS);
    }
    out
}

fn char_slice(text: &str, start: usize, end: usize) -> &str {
    let from = byte_offset(text, start);
    let to = byte_offset(text, end).max(from);
    &text[from..to]
}

fn byte_offset(text: &str, char_idx: usize) -> usize {
    text.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(text.len())
}
