//! Storage abstraction for Docs Portal.
//!
//! The [`Store`] trait defines the query contract the search, context, and
//! chat pipelines need, plus the few mutations used by document management
//! and importing. Backends: [`memory::InMemoryStore`] here, and the SQLite
//! store in the application crate.
//!
//! "Not found" is always `Ok(None)` or an empty `Vec`, never an error.
//! Errors are reserved for backend failures.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{Document, Folder};

/// Ordering for multi-document listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentOrder {
    /// The backend's natural (insertion) order.
    Natural,
    /// Most recently updated first; ties keep natural order.
    RecentlyUpdated,
}

/// Abstract storage backend.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`folder_by_id`](Store::folder_by_id) | Folder lookup by id |
/// | [`folder_by_slug`](Store::folder_by_slug) | First folder with a slug, anywhere in the tree |
/// | [`folder_by_slug_in`](Store::folder_by_slug_in) | Folder lookup scoped to one parent |
/// | [`child_folders`](Store::child_folders) | Children of a folder |
/// | [`list_folders`](Store::list_folders) | Every folder |
/// | [`documents_in_folder`](Store::documents_in_folder) | Published documents directly in a folder (or the root) |
/// | [`document_by_slug`](Store::document_by_slug) | Document lookup within a folder scope |
/// | [`published_documents`](Store::published_documents) | Published documents with text content |
/// | [`all_published`](Store::all_published) | Every published document |
/// | [`pending_pdfs`](Store::pending_pdfs) | Published PDFs without extracted text |
#[async_trait]
pub trait Store: Send + Sync {
    async fn folder_by_id(&self, id: &str) -> Result<Option<Folder>>;

    /// First folder with this slug, ordered by display order then id.
    async fn folder_by_slug(&self, slug: &str) -> Result<Option<Folder>>;

    /// Folder with this slug whose parent is `parent_id` (`None` = root).
    async fn folder_by_slug_in(&self, parent_id: Option<&str>, slug: &str)
        -> Result<Option<Folder>>;

    /// Children of `parent_id`, ordered by display order then name.
    async fn child_folders(&self, parent_id: &str) -> Result<Vec<Folder>>;

    /// All folders, ordered by display order then name.
    async fn list_folders(&self) -> Result<Vec<Folder>>;

    /// Published documents whose folder reference equals `folder_id`,
    /// in natural order. `None` selects root documents.
    async fn documents_in_folder(&self, folder_id: Option<&str>) -> Result<Vec<Document>>;

    /// Document with `slug` in the `folder_id` scope, regardless of publish state.
    async fn document_by_slug(&self, slug: &str, folder_id: Option<&str>)
        -> Result<Option<Document>>;

    /// Published documents with non-empty content.
    async fn published_documents(&self, order: DocumentOrder) -> Result<Vec<Document>>;

    /// Every published document, including those without content.
    async fn all_published(&self, order: DocumentOrder) -> Result<Vec<Document>>;

    /// Published PDF documents whose content has not been extracted yet.
    async fn pending_pdfs(&self) -> Result<Vec<Document>>;

    async fn insert_document(&self, doc: &Document) -> Result<()>;

    /// Replace the stored fields of the document with `doc.id`.
    async fn update_document(&self, doc: &Document) -> Result<()>;

    /// Delete by id. Returns whether a document was removed.
    async fn delete_document(&self, id: &str) -> Result<bool>;

    async fn insert_folder(&self, folder: &Folder) -> Result<()>;
}
