//! Document and folder management over a [`Store`].
//!
//! Documents are addressed by path: `folder/.../slug`, or just `slug` at the
//! root. A path's folder segments must name an exact chain of folders
//! from the root (see [`locate_folder`]); anything else is not found.
//!
//! # Operations
//!
//! | Function | Purpose |
//! |----------|---------|
//! | [`create_document`] | Create (or overwrite) a document from a title |
//! | [`upload_document`] | Create or update from uploaded markdown |
//! | [`update_document`] | Replace a document's content |
//! | [`delete_document`] | Delete by path |
//! | [`create_folder`] | Create a folder under the root or a parent |
//! | [`get_document`] | Fetch one published document with headings |
//! | [`list_documents`] | All published documents, most recent first |
//! | [`docs_tree`] | Navigation tree of folders and documents |
//! | [`process_pending_pdfs`] | Extract text for PDFs without content |

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use docs_portal_core::folders::{locate_folder, FolderPaths};
use docs_portal_core::models::{Document, FileInfo, Folder, Heading, NodeKind, TreeNode, MIME_PDF};
use docs_portal_core::slug::{extract_headings, first_heading_title, slugify};
use docs_portal_core::store::{DocumentOrder, Store};

use crate::extract::extract_text;

/// Slug used for uploads whose title and filename both slugify to nothing.
pub const FALLBACK_SLUG: &str = "document";

/// Root-level slugs taken by the HTTP API's own `/api/docs/<name>` routes.
pub const RESERVED_ROOT_SLUGS: &[&str] = &["update", "upload", "process-pdfs"];

/// Whether a document with `slug` at the root would be shadowed by a route.
pub fn is_reserved_root_slug(slug: &str) -> bool {
    RESERVED_ROOT_SLUGS.contains(&slug)
}

fn check_not_reserved(slug: &str, folder_id: Option<&str>) -> Result<(), DocsError> {
    if folder_id.is_none() && is_reserved_root_slug(slug) {
        return Err(DocsError::Validation(format!(
            "'{}' is reserved at the root; choose another title or a folder",
            slug
        )));
    }
    Ok(())
}

#[derive(Debug, Error)]
pub enum DocsError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// A document path split into folder segments and the document slug.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocPath {
    pub folders: Vec<String>,
    pub slug: String,
}

impl DocPath {
    /// Parse `a/b/c`. Empty segments are ignored; `None` when nothing is left.
    pub fn parse(path: &str) -> Option<Self> {
        let mut segments: Vec<String> = path
            .split('/')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        let slug = segments.pop()?;
        Some(Self {
            folders: segments,
            slug,
        })
    }
}

/// Serializable view of a document for the API and CLI.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentView {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub path: String,
    /// Slug of the owning folder; empty at the root.
    pub folder: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<FileInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub headings: Vec<Heading>,
}

impl DocumentView {
    fn new(doc: &Document, paths: &FolderPaths) -> Self {
        let folder = doc
            .folder_id
            .as_deref()
            .and_then(|id| paths.slug_of(id))
            .unwrap_or_default()
            .to_string();
        Self {
            id: doc.id.clone(),
            title: doc.title.clone(),
            slug: doc.slug.clone(),
            path: paths.document_path(doc.folder_id.as_deref(), &doc.slug),
            folder,
            content: doc.content.clone().unwrap_or_default(),
            file: doc.file.clone(),
            author: doc.author_name.clone(),
            created_at: format_ts_iso(doc.created_at),
            updated_at: format_ts_iso(doc.updated_at),
            headings: Vec::new(),
        }
    }
}

fn format_ts_iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
        .unwrap_or_else(|| ts.to_string())
}

/// Input for [`create_document`].
#[derive(Debug, Clone, Default)]
pub struct NewDocument {
    pub title: String,
    pub content: Option<String>,
    pub folder: Option<String>,
}

/// Input for [`upload_document`].
#[derive(Debug, Clone, Default)]
pub struct UploadedDocument {
    pub title: String,
    pub content: String,
    pub folder: Option<String>,
    pub filename: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadOutcome {
    pub path: String,
    pub created: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PdfReport {
    pub processed: usize,
    pub errors: usize,
    pub total: usize,
}

async fn folder_paths<S: Store + ?Sized>(store: &S) -> Result<FolderPaths, DocsError> {
    Ok(FolderPaths::new(&store.list_folders().await?))
}

/// Folder id for an optional folder slug; unknown or blank slugs mean the root.
async fn folder_id_for<S: Store + ?Sized>(
    store: &S,
    folder: Option<&str>,
) -> Result<Option<String>, DocsError> {
    let Some(slug) = folder.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    match store.folder_by_slug(slug).await? {
        Some(f) => Ok(Some(f.id)),
        None => {
            warn!(folder = slug, "unknown folder; placing document at the root");
            Ok(None)
        }
    }
}

/// Find the stored document a path names, in any publish state.
async fn find_by_path<S: Store + ?Sized>(
    store: &S,
    path: &DocPath,
) -> Result<Option<Document>, DocsError> {
    let folder_id = if path.folders.is_empty() {
        None
    } else {
        let segments: Vec<&str> = path.folders.iter().map(String::as_str).collect();
        match locate_folder(store, &segments).await? {
            Some(folder) => Some(folder.id),
            None => return Ok(None),
        }
    };
    Ok(store.document_by_slug(&path.slug, folder_id.as_deref()).await?)
}

fn require_path(path: &str) -> Result<DocPath, DocsError> {
    DocPath::parse(path).ok_or_else(|| DocsError::Validation("path is required".to_string()))
}

/// Insert a new document or overwrite the one at the same path.
/// Returns the document and whether it was newly created.
async fn save<S: Store + ?Sized>(
    store: &S,
    title: &str,
    slug: &str,
    content: &str,
    folder_id: Option<&str>,
) -> Result<(Document, bool), DocsError> {
    match store.document_by_slug(slug, folder_id).await? {
        Some(mut existing) => {
            existing.title = title.to_string();
            existing.content = Some(content.to_string());
            existing.updated_at = Utc::now().timestamp();
            store.update_document(&existing).await?;
            Ok((existing, false))
        }
        None => {
            let doc = Document::new(title, slug, Some(content), folder_id);
            store.insert_document(&doc).await?;
            Ok((doc, true))
        }
    }
}

/// Create a document from a title. Returns its path.
pub async fn create_document<S: Store + ?Sized>(
    store: &S,
    input: &NewDocument,
) -> Result<String, DocsError> {
    let title = input.title.trim();
    if title.is_empty() {
        return Err(DocsError::Validation("title is required".to_string()));
    }
    let slug = slugify(title);
    if slug.is_empty() {
        return Err(DocsError::Validation(format!(
            "title '{}' does not produce a usable slug",
            title
        )));
    }

    let content = match input.content.as_deref() {
        Some(c) if !c.is_empty() => c.to_string(),
        _ => format!("# {}\n\nContent goes here...", title),
    };
    let folder_id = folder_id_for(store, input.folder.as_deref()).await?;
    check_not_reserved(&slug, folder_id.as_deref())?;

    let (doc, created) = save(store, title, &slug, &content, folder_id.as_deref()).await?;
    let path = folder_paths(store)
        .await?
        .document_path(doc.folder_id.as_deref(), &doc.slug);
    info!(path = %path, created, "document saved");
    Ok(path)
}

/// Create or update a document from uploaded markdown.
pub async fn upload_document<S: Store + ?Sized>(
    store: &S,
    input: &UploadedDocument,
) -> Result<UploadOutcome, DocsError> {
    let title = input.title.trim();
    if title.is_empty() || input.content.is_empty() {
        return Err(DocsError::Validation(
            "title and content are required".to_string(),
        ));
    }

    let mut slug = slugify(title);
    if slug.is_empty() {
        slug = input
            .filename
            .as_deref()
            .map(|f| slugify(f.trim_end_matches(".md")))
            .unwrap_or_default();
    }
    if slug.is_empty() {
        slug = FALLBACK_SLUG.to_string();
    }

    let folder_id = folder_id_for(store, input.folder.as_deref()).await?;
    check_not_reserved(&slug, folder_id.as_deref())?;
    let (doc, created) = save(store, title, &slug, &input.content, folder_id.as_deref()).await?;
    let path = folder_paths(store)
        .await?
        .document_path(doc.folder_id.as_deref(), &doc.slug);
    info!(path = %path, created, "document uploaded");
    Ok(UploadOutcome { path, created })
}

/// Replace a document's content. The title follows the first `# ` heading
/// of the new content when there is one.
pub async fn update_document<S: Store + ?Sized>(
    store: &S,
    path: &str,
    content: &str,
) -> Result<(), DocsError> {
    let doc_path = require_path(path)?;
    let mut doc = find_by_path(store, &doc_path)
        .await?
        .ok_or_else(|| DocsError::NotFound(format!("document not found: {}", path)))?;

    if let Some(title) = first_heading_title(content) {
        doc.title = title;
    }
    doc.content = Some(content.to_string());
    doc.updated_at = Utc::now().timestamp();
    store.update_document(&doc).await?;
    info!(path, id = %doc.id, "document updated");
    Ok(())
}

pub async fn delete_document<S: Store + ?Sized>(store: &S, path: &str) -> Result<(), DocsError> {
    let doc_path = require_path(path)?;
    let doc = find_by_path(store, &doc_path).await?;
    let deleted = match doc {
        Some(d) => store.delete_document(&d.id).await?,
        None => false,
    };
    if !deleted {
        return Err(DocsError::NotFound(format!("document not found: {}", path)));
    }
    info!(path, "document deleted");
    Ok(())
}

/// Create a folder at the root or under the folder with slug `parent`.
pub async fn create_folder<S: Store + ?Sized>(
    store: &S,
    name: &str,
    parent: Option<&str>,
) -> Result<Folder, DocsError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DocsError::Validation("name is required".to_string()));
    }
    let slug = slugify(name);
    if slug.is_empty() {
        return Err(DocsError::Validation(format!(
            "folder name '{}' does not produce a usable slug",
            name
        )));
    }

    let parent_id = match parent.map(str::trim).filter(|p| !p.is_empty()) {
        Some(p) => Some(
            store
                .folder_by_slug(p)
                .await?
                .ok_or_else(|| DocsError::NotFound(format!("parent folder not found: {}", p)))?
                .id,
        ),
        None => None,
    };

    if store
        .folder_by_slug_in(parent_id.as_deref(), &slug)
        .await?
        .is_some()
    {
        return Err(DocsError::Conflict(format!("folder already exists: {}", slug)));
    }

    let folder = Folder::new(name, &slug, parent_id.as_deref());
    store.insert_folder(&folder).await?;
    info!(slug = %folder.slug, parent = ?parent_id, "folder created");
    Ok(folder)
}

/// One published document by path, with its headings.
pub async fn get_document<S: Store + ?Sized>(
    store: &S,
    path: &str,
) -> Result<Option<DocumentView>, DocsError> {
    let Some(doc_path) = DocPath::parse(path) else {
        return Ok(None);
    };
    let Some(doc) = find_by_path(store, &doc_path).await? else {
        return Ok(None);
    };
    if !doc.is_published {
        return Ok(None);
    }

    let paths = folder_paths(store).await?;
    let mut view = DocumentView::new(&doc, &paths);
    view.headings = extract_headings(&view.content);
    Ok(Some(view))
}

pub async fn list_documents<S: Store + ?Sized>(store: &S) -> Result<Vec<DocumentView>, DocsError> {
    let paths = folder_paths(store).await?;
    Ok(store
        .all_published(DocumentOrder::RecentlyUpdated)
        .await?
        .iter()
        .map(|d| DocumentView::new(d, &paths))
        .collect())
}

/// Navigation tree: root folders, then root documents. Inside a folder,
/// child folders come first, then its documents sorted by title.
pub async fn docs_tree<S: Store + ?Sized>(store: &S) -> Result<Vec<TreeNode>, DocsError> {
    let folders = store.list_folders().await?;
    let docs = store.all_published(DocumentOrder::Natural).await?;
    Ok(build_tree(&folders, docs))
}

/// Build the tree from folders (already in display order) and documents.
///
/// Folders whose parent does not exist are shown at the root, and so is the
/// first folder of any parent loop that cannot be reached from the root.
/// Each folder appears at most once, so a loop cannot recurse forever.
pub fn build_tree(folders: &[Folder], mut docs: Vec<Document>) -> Vec<TreeNode> {
    let paths = FolderPaths::new(folders);
    let ids: HashSet<&str> = folders.iter().map(|f| f.id.as_str()).collect();

    let mut children: HashMap<Option<&str>, Vec<&Folder>> = HashMap::new();
    for folder in folders {
        let parent = folder
            .parent_id
            .as_deref()
            .filter(|p| ids.contains(p) && *p != folder.id);
        children.entry(parent).or_default().push(folder);
    }

    docs.sort_by(|a, b| a.title.cmp(&b.title));
    let mut docs_by_folder: HashMap<Option<&str>, Vec<&Document>> = HashMap::new();
    for doc in &docs {
        let folder = doc.folder_id.as_deref().filter(|id| ids.contains(id));
        docs_by_folder.entry(folder).or_default().push(doc);
    }

    let tree = TreeBuilder {
        paths: &paths,
        children: &children,
        docs: &docs_by_folder,
    };
    let mut visited = HashSet::new();
    let mut nodes = tree.folders(None, &mut visited);
    for folder in folders {
        if !visited.contains(&folder.id) {
            if let Some(node) = tree.folder_node(folder, &mut visited) {
                nodes.push(node);
            }
        }
    }
    nodes.extend(tree.documents(None));
    nodes
}

struct TreeBuilder<'a> {
    paths: &'a FolderPaths,
    children: &'a HashMap<Option<&'a str>, Vec<&'a Folder>>,
    docs: &'a HashMap<Option<&'a str>, Vec<&'a Document>>,
}

impl<'a> TreeBuilder<'a> {
    fn level(&self, parent: Option<&'a str>, visited: &mut HashSet<String>) -> Vec<TreeNode> {
        let mut nodes = self.folders(parent, visited);
        nodes.extend(self.documents(parent));
        nodes
    }

    fn folders(&self, parent: Option<&'a str>, visited: &mut HashSet<String>) -> Vec<TreeNode> {
        self.children
            .get(&parent)
            .into_iter()
            .flatten()
            .filter_map(|folder| self.folder_node(*folder, visited))
            .collect()
    }

    fn folder_node(&self, folder: &'a Folder, visited: &mut HashSet<String>) -> Option<TreeNode> {
        if !visited.insert(folder.id.clone()) {
            return None;
        }
        Some(TreeNode {
            id: folder.id.clone(),
            name: folder.name.clone(),
            slug: folder.slug.clone(),
            kind: NodeKind::Folder,
            path: self
                .paths
                .path_of(&folder.id)
                .unwrap_or(&folder.slug)
                .to_string(),
            children: self.level(Some(folder.id.as_str()), visited),
        })
    }

    fn documents(&self, parent: Option<&'a str>) -> Vec<TreeNode> {
        self.docs
            .get(&parent)
            .into_iter()
            .flatten()
            .map(|doc| TreeNode {
                id: doc.id.clone(),
                name: doc.title.clone(),
                slug: doc.slug.clone(),
                kind: NodeKind::File,
                path: self.paths.document_path(parent, &doc.slug),
                children: Vec::new(),
            })
            .collect()
    }
}

/// Source of attached file bytes.
#[async_trait]
pub trait FileFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> anyhow::Result<Vec<u8>>;
}

/// Fetches `http(s)://` URLs with reqwest; `file://` URLs and bare paths
/// are read from the local filesystem.
#[derive(Debug, Clone)]
pub struct HttpFileFetcher {
    client: reqwest::Client,
}

impl HttpFileFetcher {
    pub fn new(timeout_secs: u64) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl FileFetcher for HttpFileFetcher {
    async fn fetch(&self, url: &str) -> anyhow::Result<Vec<u8>> {
        if url.starts_with("http://") || url.starts_with("https://") {
            let response = self.client.get(url).send().await?;
            let status = response.status();
            if !status.is_success() {
                anyhow::bail!("GET {} returned {}", url, status);
            }
            return Ok(response.bytes().await?.to_vec());
        }
        let path = url.strip_prefix("file://").unwrap_or(url);
        Ok(tokio::fs::read(Path::new(path)).await?)
    }
}

/// Extract and store text for every published PDF without content.
///
/// A failure on one document is logged and counted; the batch continues.
pub async fn process_pending_pdfs<S, F>(store: &S, fetcher: &F) -> Result<PdfReport, DocsError>
where
    S: Store + ?Sized,
    F: FileFetcher + ?Sized,
{
    let pending = store.pending_pdfs().await?;
    let mut report = PdfReport {
        total: pending.len(),
        ..PdfReport::default()
    };

    for mut doc in pending {
        let Some(url) = doc.file.as_ref().map(|f| f.url.clone()) else {
            continue;
        };

        let text = match fetcher.fetch(&url).await {
            Ok(bytes) => match extract_text(&bytes, MIME_PDF) {
                Ok(text) => text,
                Err(e) => {
                    warn!(id = %doc.id, error = %e, "PDF text extraction failed");
                    report.errors += 1;
                    continue;
                }
            },
            Err(e) => {
                warn!(id = %doc.id, url = %url, error = %e, "failed to fetch PDF");
                report.errors += 1;
                continue;
            }
        };

        doc.content = Some(text);
        doc.updated_at = Utc::now().timestamp();
        match store.update_document(&doc).await {
            Ok(()) => report.processed += 1,
            Err(e) => {
                warn!(id = %doc.id, error = %e, "failed to store extracted PDF text");
                report.errors += 1;
            }
        }
    }

    info!(
        processed = report.processed,
        errors = report.errors,
        total = report.total,
        "PDF processing finished"
    );
    Ok(report)
}
