//! Chat context assembly.
//!
//! A context selector scopes the documentation handed to the chat
//! assistant:
//!
//! | Selector | Resolves to |
//! |----------|-------------|
//! | `all` | Most recently updated published documents |
//! | `slug` | The folder with that slug (recursively), else the root document |
//! | `folder/.../doc` | Document `doc` inside the folder named by the first segment |
//!
//! Only the first and last segments of a multi-segment selector are used:
//! the folder is looked up by its own slug, not by walking intermediate
//! folders. Selected documents are rendered as `## {title}\n{content}`
//! blocks joined by `\n\n---\n\n`, capped at `max_documents`. When nothing
//! resolves, the blob is [`NO_CONTEXT_PLACEHOLDER`]; a missing document is
//! never an error.

use anyhow::Result;
use tracing::debug;

use crate::folders::{resolve_folder_documents, DEFAULT_MAX_FOLDER_DEPTH};
use crate::models::{ContextDocument, Document};
use crate::store::{DocumentOrder, Store};

/// Context text used when no documentation matches the selector.
pub const NO_CONTEXT_PLACEHOLDER: &str = "No documentation is available for this query.";

/// Default hard cap on documents per context blob.
pub const DEFAULT_MAX_CONTEXT_DOCUMENTS: usize = 50;

/// Sentinel selector for every published document.
pub const ALL_SELECTOR: &str = "all";

const BLOCK_SEPARATOR: &str = "\n\n---\n\n";

/// Parsed context selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextSelector {
    All,
    /// A folder slug or a root document slug; the folder wins when both exist.
    Single(String),
    /// A document inside a folder: first and last path segments.
    Nested { folder: String, document: String },
}

impl ContextSelector {
    /// Parse a selector string. Blank input means `all`; empty path segments
    /// from stray slashes are ignored.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.is_empty() || raw == ALL_SELECTOR {
            return ContextSelector::All;
        }

        let segments: Vec<&str> = raw
            .split('/')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();

        match segments.as_slice() {
            [] => ContextSelector::All,
            [single] => ContextSelector::Single(single.to_string()),
            [first, .., last] => ContextSelector::Nested {
                folder: first.to_string(),
                document: last.to_string(),
            },
        }
    }
}

/// Bounds applied while assembling context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextLimits {
    pub max_documents: usize,
    pub max_folder_depth: usize,
}

impl Default for ContextLimits {
    fn default() -> Self {
        Self {
            max_documents: DEFAULT_MAX_CONTEXT_DOCUMENTS,
            max_folder_depth: DEFAULT_MAX_FOLDER_DEPTH,
        }
    }
}

/// Resolve a selector to the documents it covers, in a stable order.
pub async fn resolve_context<S: Store + ?Sized>(
    store: &S,
    selector: &ContextSelector,
    limits: ContextLimits,
) -> Result<Vec<ContextDocument>> {
    let mut docs = match selector {
        ContextSelector::All => store
            .published_documents(DocumentOrder::RecentlyUpdated)
            .await?
            .iter()
            .take(limits.max_documents)
            .filter_map(to_context)
            .collect(),
        ContextSelector::Single(slug) => match store.folder_by_slug(slug).await? {
            Some(folder) => {
                resolve_folder_documents(store, &folder.id, limits.max_folder_depth).await?
            }
            None => store
                .document_by_slug(slug, None)
                .await?
                .as_ref()
                .and_then(to_context)
                .into_iter()
                .collect(),
        },
        ContextSelector::Nested { folder, document } => {
            match store.folder_by_slug(folder).await? {
                Some(f) => store
                    .document_by_slug(document, Some(&f.id))
                    .await?
                    .as_ref()
                    .and_then(to_context)
                    .into_iter()
                    .collect(),
                None => Vec::new(),
            }
        }
    };

    docs.truncate(limits.max_documents);
    debug!(?selector, documents = docs.len(), "context resolved");
    Ok(docs)
}

/// Render documents as markdown blocks. Empty input renders as an empty string.
pub fn format_context(docs: &[ContextDocument]) -> String {
    docs.iter()
        .map(|d| format!("## {}\n{}", d.title, d.content))
        .collect::<Vec<_>>()
        .join(BLOCK_SEPARATOR)
}

/// Resolve and render a selector, substituting [`NO_CONTEXT_PLACEHOLDER`]
/// when nothing matched.
pub async fn assemble_context<S: Store + ?Sized>(
    store: &S,
    selector: &ContextSelector,
    limits: ContextLimits,
) -> Result<String> {
    let docs = resolve_context(store, selector, limits).await?;
    if docs.is_empty() {
        return Ok(NO_CONTEXT_PLACEHOLDER.to_string());
    }
    Ok(format_context(&docs))
}

fn to_context(doc: &Document) -> Option<ContextDocument> {
    if !doc.is_published {
        return None;
    }
    doc.text().map(|text| ContextDocument {
        title: doc.title.clone(),
        content: text.to_string(),
    })
}
