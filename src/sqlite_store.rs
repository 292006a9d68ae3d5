//! SQLite-backed [`Store`] implementation.
//!
//! Natural order is `rowid` (insertion) order, matching the in-memory
//! store. "Recently updated" sorts by `updated_at DESC` and breaks ties by
//! `rowid`, so both backends produce the same listings.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use docs_portal_core::models::{Document, FileInfo, Folder, MIME_PDF};
use docs_portal_core::store::{DocumentOrder, Store};

const DOCUMENT_COLUMNS: &str = "id, title, slug, content, folder_id, is_published, file_url, \
     file_type, file_size, author_name, created_at, updated_at";

const FOLDER_COLUMNS: &str =
    "id, name, slug, parent_id, icon, display_order, created_at, updated_at";

/// SQLite implementation of the [`Store`] trait over the `documents` and
/// `folders` tables.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn order_clause(order: DocumentOrder) -> &'static str {
    match order {
        DocumentOrder::Natural => "ORDER BY rowid ASC",
        DocumentOrder::RecentlyUpdated => "ORDER BY updated_at DESC, rowid ASC",
    }
}

fn row_to_document(row: &SqliteRow) -> Document {
    let file_url: Option<String> = row.get("file_url");
    let file_type: Option<String> = row.get("file_type");
    let file = match (file_url, file_type) {
        (Some(url), Some(mime_type)) => Some(FileInfo {
            url,
            mime_type,
            size_bytes: row.get("file_size"),
        }),
        _ => None,
    };
    let is_published: i64 = row.get("is_published");

    Document {
        id: row.get("id"),
        title: row.get("title"),
        slug: row.get("slug"),
        content: row.get("content"),
        folder_id: row.get("folder_id"),
        is_published: is_published != 0,
        file,
        author_name: row.get("author_name"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn row_to_folder(row: &SqliteRow) -> Folder {
    Folder {
        id: row.get("id"),
        name: row.get("name"),
        slug: row.get("slug"),
        parent_id: row.get("parent_id"),
        icon: row.get("icon"),
        display_order: row.get("display_order"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn folder_by_id(&self, id: &str) -> Result<Option<Folder>> {
        let row = sqlx::query(&format!("SELECT {} FROM folders WHERE id = ?", FOLDER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(row_to_folder))
    }

    async fn folder_by_slug(&self, slug: &str) -> Result<Option<Folder>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM folders WHERE slug = ? ORDER BY display_order ASC, id ASC LIMIT 1",
            FOLDER_COLUMNS
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(row_to_folder))
    }

    async fn folder_by_slug_in(
        &self,
        parent_id: Option<&str>,
        slug: &str,
    ) -> Result<Option<Folder>> {
        // `IS` compares NULL to NULL as equal, covering the root scope
        let row = sqlx::query(&format!(
            "SELECT {} FROM folders WHERE slug = ? AND parent_id IS ? LIMIT 1",
            FOLDER_COLUMNS
        ))
        .bind(slug)
        .bind(parent_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(row_to_folder))
    }

    async fn child_folders(&self, parent_id: &str) -> Result<Vec<Folder>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM folders WHERE parent_id = ? ORDER BY display_order ASC, name ASC",
            FOLDER_COLUMNS
        ))
        .bind(parent_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(row_to_folder).collect())
    }

    async fn list_folders(&self) -> Result<Vec<Folder>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM folders ORDER BY display_order ASC, name ASC",
            FOLDER_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(row_to_folder).collect())
    }

    async fn documents_in_folder(&self, folder_id: Option<&str>) -> Result<Vec<Document>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM documents WHERE folder_id IS ? AND is_published = 1 ORDER BY rowid ASC",
            DOCUMENT_COLUMNS
        ))
        .bind(folder_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(row_to_document).collect())
    }

    async fn document_by_slug(
        &self,
        slug: &str,
        folder_id: Option<&str>,
    ) -> Result<Option<Document>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM documents WHERE slug = ? AND folder_id IS ? LIMIT 1",
            DOCUMENT_COLUMNS
        ))
        .bind(slug)
        .bind(folder_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(row_to_document))
    }

    async fn published_documents(&self, order: DocumentOrder) -> Result<Vec<Document>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM documents WHERE is_published = 1 AND content IS NOT NULL {}",
            DOCUMENT_COLUMNS,
            order_clause(order)
        ))
        .fetch_all(&self.pool)
        .await?;
        // blank-content filtering stays in Rust so whitespace rules match Document::text
        Ok(rows
            .iter()
            .map(row_to_document)
            .filter(|d| d.text().is_some())
            .collect())
    }

    async fn all_published(&self, order: DocumentOrder) -> Result<Vec<Document>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM documents WHERE is_published = 1 {}",
            DOCUMENT_COLUMNS,
            order_clause(order)
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(row_to_document).collect())
    }

    async fn pending_pdfs(&self) -> Result<Vec<Document>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM documents \
             WHERE is_published = 1 AND content IS NULL AND file_url IS NOT NULL AND file_type = ? \
             ORDER BY rowid ASC",
            DOCUMENT_COLUMNS
        ))
        .bind(MIME_PDF)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(row_to_document).collect())
    }

    async fn insert_document(&self, doc: &Document) -> Result<()> {
        let file = doc.file.as_ref();
        sqlx::query(&format!(
            "INSERT INTO documents ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            DOCUMENT_COLUMNS
        ))
        .bind(&doc.id)
        .bind(&doc.title)
        .bind(&doc.slug)
        .bind(&doc.content)
        .bind(&doc.folder_id)
        .bind(doc.is_published as i64)
        .bind(file.map(|f| f.url.as_str()))
        .bind(file.map(|f| f.mime_type.as_str()))
        .bind(file.and_then(|f| f.size_bytes))
        .bind(&doc.author_name)
        .bind(doc.created_at)
        .bind(doc.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_document(&self, doc: &Document) -> Result<()> {
        let file = doc.file.as_ref();
        sqlx::query(
            r#"
            UPDATE documents SET
                title = ?, slug = ?, content = ?, folder_id = ?, is_published = ?,
                file_url = ?, file_type = ?, file_size = ?, author_name = ?,
                created_at = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&doc.title)
        .bind(&doc.slug)
        .bind(&doc.content)
        .bind(&doc.folder_id)
        .bind(doc.is_published as i64)
        .bind(file.map(|f| f.url.as_str()))
        .bind(file.map(|f| f.mime_type.as_str()))
        .bind(file.and_then(|f| f.size_bytes))
        .bind(&doc.author_name)
        .bind(doc.created_at)
        .bind(doc.updated_at)
        .bind(&doc.id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_document(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM documents WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_folder(&self, folder: &Folder) -> Result<()> {
        sqlx::query(&format!(
            "INSERT INTO folders ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            FOLDER_COLUMNS
        ))
        .bind(&folder.id)
        .bind(&folder.name)
        .bind(&folder.slug)
        .bind(&folder.parent_id)
        .bind(&folder.icon)
        .bind(folder.display_order)
        .bind(folder.created_at)
        .bind(folder.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
