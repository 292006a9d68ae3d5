//! Core data models used throughout Docs Portal.
//!
//! These types are the typed records the store adapters produce and the
//! search, context, and chat pipelines consume.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// MIME type of documents whose text is extracted from an attached PDF.
pub const MIME_PDF: &str = "application/pdf";

/// Metadata of a file attached to a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    pub url: String,
    pub mime_type: String,
    pub size_bytes: Option<i64>,
}

/// A stored document.
///
/// `content` is `None` for non-text files, e.g. a PDF whose text has not
/// been extracted yet. `folder_id` of `None` places the document at the root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub content: Option<String>,
    pub folder_id: Option<String>,
    pub is_published: bool,
    pub file: Option<FileInfo>,
    pub author_name: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Document {
    /// New published document with a fresh UUID and the current timestamp.
    pub fn new(title: &str, slug: &str, content: Option<&str>, folder_id: Option<&str>) -> Self {
        let now = Utc::now().timestamp();
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.to_string(),
            slug: slug.to_string(),
            content: content.map(str::to_string),
            folder_id: folder_id.map(str::to_string),
            is_published: true,
            file: None,
            author_name: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Content, if present and not blank.
    pub fn text(&self) -> Option<&str> {
        self.content.as_deref().filter(|c| !c.trim().is_empty())
    }

    /// Whether this document is a PDF still waiting for text extraction.
    pub fn is_pending_pdf(&self) -> bool {
        self.is_published
            && self.content.is_none()
            && self.file.as_ref().is_some_and(|f| f.mime_type == MIME_PDF)
    }
}

/// A folder in the documentation tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folder {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub parent_id: Option<String>,
    pub icon: Option<String>,
    pub display_order: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Folder {
    pub fn new(name: &str, slug: &str, parent_id: Option<&str>) -> Self {
        let now = Utc::now().timestamp();
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            slug: slug.to_string(),
            parent_id: parent_id.map(str::to_string),
            icon: None,
            display_order: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A ranked search hit, projected from a [`Document`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: String,
    pub title: String,
    pub slug: String,
    /// Slug of the owning folder; empty for root documents.
    pub folder: String,
    pub excerpt: String,
    pub match_score: i64,
}

/// Title and body of one document selected as chat context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextDocument {
    pub title: String,
    pub content: String,
}

/// Speaker of a chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One message of a chat conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Kind of a [`TreeNode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Folder,
    File,
}

/// A node of the navigation tree: a folder with children, or a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeNode {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub kind: NodeKind,
    pub path: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeNode>,
}

/// A markdown heading, used for tables of contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heading {
    pub level: u8,
    pub text: String,
    pub id: String,
}
