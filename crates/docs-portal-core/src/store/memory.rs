//! In-memory [`Store`] implementation for tests and embedding.
//!
//! Documents and folders live in `Vec`s behind `std::sync::RwLock`, so
//! natural order is insertion order.

use std::sync::RwLock;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{Document, Folder};

use super::{DocumentOrder, Store};

/// In-memory store.
pub struct InMemoryStore {
    docs: RwLock<Vec<Document>>,
    folders: RwLock<Vec<Folder>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            docs: RwLock::new(Vec::new()),
            folders: RwLock::new(Vec::new()),
        }
    }

    /// Build a store pre-populated with folders and documents.
    pub fn with_data(folders: Vec<Folder>, docs: Vec<Document>) -> Self {
        Self {
            docs: RwLock::new(docs),
            folders: RwLock::new(folders),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn sort_folders(folders: &mut [Folder]) {
    folders.sort_by(|a, b| {
        a.display_order
            .cmp(&b.display_order)
            .then_with(|| a.name.cmp(&b.name))
    });
}

fn apply_order(docs: &mut [Document], order: DocumentOrder) {
    if order == DocumentOrder::RecentlyUpdated {
        // stable: equal timestamps keep insertion order
        docs.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn folder_by_id(&self, id: &str) -> Result<Option<Folder>> {
        let folders = self.folders.read().unwrap();
        Ok(folders.iter().find(|f| f.id == id).cloned())
    }

    async fn folder_by_slug(&self, slug: &str) -> Result<Option<Folder>> {
        let folders = self.folders.read().unwrap();
        Ok(folders
            .iter()
            .filter(|f| f.slug == slug)
            .min_by(|a, b| {
                a.display_order
                    .cmp(&b.display_order)
                    .then_with(|| a.id.cmp(&b.id))
            })
            .cloned())
    }

    async fn folder_by_slug_in(
        &self,
        parent_id: Option<&str>,
        slug: &str,
    ) -> Result<Option<Folder>> {
        let folders = self.folders.read().unwrap();
        Ok(folders
            .iter()
            .find(|f| f.slug == slug && f.parent_id.as_deref() == parent_id)
            .cloned())
    }

    async fn child_folders(&self, parent_id: &str) -> Result<Vec<Folder>> {
        let folders = self.folders.read().unwrap();
        let mut children: Vec<Folder> = folders
            .iter()
            .filter(|f| f.parent_id.as_deref() == Some(parent_id))
            .cloned()
            .collect();
        sort_folders(&mut children);
        Ok(children)
    }

    async fn list_folders(&self) -> Result<Vec<Folder>> {
        let mut folders = self.folders.read().unwrap().clone();
        sort_folders(&mut folders);
        Ok(folders)
    }

    async fn documents_in_folder(&self, folder_id: Option<&str>) -> Result<Vec<Document>> {
        let docs = self.docs.read().unwrap();
        Ok(docs
            .iter()
            .filter(|d| d.is_published && d.folder_id.as_deref() == folder_id)
            .cloned()
            .collect())
    }

    async fn document_by_slug(
        &self,
        slug: &str,
        folder_id: Option<&str>,
    ) -> Result<Option<Document>> {
        let docs = self.docs.read().unwrap();
        Ok(docs
            .iter()
            .find(|d| d.slug == slug && d.folder_id.as_deref() == folder_id)
            .cloned())
    }

    async fn published_documents(&self, order: DocumentOrder) -> Result<Vec<Document>> {
        let mut docs: Vec<Document> = self
            .docs
            .read()
            .unwrap()
            .iter()
            .filter(|d| d.is_published && d.text().is_some())
            .cloned()
            .collect();
        apply_order(&mut docs, order);
        Ok(docs)
    }

    async fn all_published(&self, order: DocumentOrder) -> Result<Vec<Document>> {
        let mut docs: Vec<Document> = self
            .docs
            .read()
            .unwrap()
            .iter()
            .filter(|d| d.is_published)
            .cloned()
            .collect();
        apply_order(&mut docs, order);
        Ok(docs)
    }

    async fn pending_pdfs(&self) -> Result<Vec<Document>> {
        let docs = self.docs.read().unwrap();
        Ok(docs.iter().filter(|d| d.is_pending_pdf()).cloned().collect())
    }

    async fn insert_document(&self, doc: &Document) -> Result<()> {
        let mut docs = self.docs.write().unwrap();
        if docs
            .iter()
            .any(|d| d.slug == doc.slug && d.folder_id == doc.folder_id)
        {
            anyhow::bail!(
                "document slug '{}' already exists in this folder",
                doc.slug
            );
        }
        docs.push(doc.clone());
        Ok(())
    }

    async fn update_document(&self, doc: &Document) -> Result<()> {
        let mut docs = self.docs.write().unwrap();
        if let Some(existing) = docs.iter_mut().find(|d| d.id == doc.id) {
            *existing = doc.clone();
        }
        Ok(())
    }

    async fn delete_document(&self, id: &str) -> Result<bool> {
        let mut docs = self.docs.write().unwrap();
        let before = docs.len();
        docs.retain(|d| d.id != id);
        Ok(docs.len() != before)
    }

    async fn insert_folder(&self, folder: &Folder) -> Result<()> {
        let mut folders = self.folders.write().unwrap();
        if folders
            .iter()
            .any(|f| f.slug == folder.slug && f.parent_id == folder.parent_id)
        {
            anyhow::bail!("folder slug '{}' already exists here", folder.slug);
        }
        folders.push(folder.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc_at(title: &str, updated_at: i64) -> Document {
        let mut d = Document::new(title, &crate::slug::slugify(title), Some("body"), None);
        d.updated_at = updated_at;
        d
    }

    #[tokio::test]
    async fn test_recently_updated_is_stable() {
        let store = InMemoryStore::with_data(
            vec![],
            vec![doc_at("A", 10), doc_at("B", 20), doc_at("C", 10)],
        );
        let titles: Vec<String> = store
            .published_documents(DocumentOrder::RecentlyUpdated)
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.title)
            .collect();
        assert_eq!(titles, vec!["B", "A", "C"]);
    }

    #[tokio::test]
    async fn test_published_documents_skip_drafts_and_empty() {
        let mut draft = doc_at("Draft", 1);
        draft.is_published = false;
        let mut empty = doc_at("Empty", 1);
        empty.content = Some("   ".to_string());
        let mut file_only = doc_at("File", 1);
        file_only.content = None;
        let store =
            InMemoryStore::with_data(vec![], vec![draft, empty, file_only, doc_at("Real", 1)]);

        let docs = store.published_documents(DocumentOrder::Natural).await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].title, "Real");
        assert_eq!(store.all_published(DocumentOrder::Natural).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_duplicate_slug_rejected_per_scope() {
        let store = InMemoryStore::new();
        store.insert_document(&doc_at("Same", 1)).await.unwrap();
        assert!(store.insert_document(&doc_at("Same", 2)).await.is_err());

        let mut other_scope = doc_at("Same", 3);
        other_scope.folder_id = Some("f1".to_string());
        store.insert_document(&other_scope).await.unwrap();
    }

    #[tokio::test]
    async fn test_child_folders_sorted() {
        let parent = Folder::new("Parent", "parent", None);
        let mut b = Folder::new("Beta", "beta", Some(&parent.id));
        b.display_order = 1;
        let a = Folder::new("Alpha", "alpha", Some(&parent.id));
        let store = InMemoryStore::with_data(vec![parent.clone(), b, a], vec![]);

        let names: Vec<String> = store
            .child_folders(&parent.id)
            .await
            .unwrap()
            .into_iter()
            .map(|f| f.name)
            .collect();
        assert_eq!(names, vec!["Alpha", "Beta"]);
    }
}
