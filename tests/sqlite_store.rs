//! SQLite store integration tests.
//!
//! Each test runs against a fresh database file in a temp directory, and
//! ordering checks are compared against the in-memory store.

use docs_portal::db;
use docs_portal::migrate;
use docs_portal::sqlite_store::SqliteStore;
use docs_portal_core::context::{assemble_context, ContextLimits, ContextSelector, NO_CONTEXT_PLACEHOLDER};
use docs_portal_core::models::{Document, FileInfo, Folder, MIME_PDF};
use docs_portal_core::search::{search, DEFAULT_MAX_RESULTS};
use docs_portal_core::store::memory::InMemoryStore;
use docs_portal_core::store::{DocumentOrder, Store};
use tempfile::TempDir;

async fn sqlite_store() -> (TempDir, SqliteStore) {
    let tmp = TempDir::new().unwrap();
    let pool = db::connect_path(&tmp.path().join("data/portal.sqlite"))
        .await
        .unwrap();
    migrate::apply_schema(&pool).await.unwrap();
    (tmp, SqliteStore::new(pool))
}

fn doc_at(title: &str, slug: &str, content: Option<&str>, folder: Option<&str>, updated: i64) -> Document {
    let mut d = Document::new(title, slug, content, folder);
    d.created_at = updated;
    d.updated_at = updated;
    d
}

fn folder(id: &str, name: &str, slug: &str, parent: Option<&str>, order: i64) -> Folder {
    let mut f = Folder::new(name, slug, parent);
    f.id = id.to_string();
    f.display_order = order;
    f
}

async fn titles<S: Store + ?Sized>(store: &S, order: DocumentOrder) -> Vec<String> {
    store
        .published_documents(order)
        .await
        .unwrap()
        .into_iter()
        .map(|d| d.title)
        .collect()
}

#[tokio::test]
async fn test_ordering_matches_in_memory_store() {
    let (_tmp, sqlite) = sqlite_store().await;
    let memory = InMemoryStore::new();

    let mut draft = doc_at("Draft", "draft", Some("hidden"), None, 50);
    draft.is_published = false;
    let docs = vec![
        doc_at("A", "a", Some("alpha"), None, 10),
        doc_at("B", "b", Some("beta"), None, 20),
        doc_at("C", "c", Some("gamma"), None, 10),
        doc_at("Blank", "blank", Some("   "), None, 30),
        doc_at("Scan", "scan", None, None, 40),
        draft,
    ];
    for d in &docs {
        sqlite.insert_document(d).await.unwrap();
        memory.insert_document(d).await.unwrap();
    }

    for order in [DocumentOrder::Natural, DocumentOrder::RecentlyUpdated] {
        assert_eq!(titles(&sqlite, order).await, titles(&memory, order).await);
    }
    assert_eq!(titles(&sqlite, DocumentOrder::RecentlyUpdated).await, vec!["B", "A", "C"]);

    let all: Vec<String> = sqlite
        .all_published(DocumentOrder::Natural)
        .await
        .unwrap()
        .into_iter()
        .map(|d| d.title)
        .collect();
    assert_eq!(all, vec!["A", "B", "C", "Blank", "Scan"]);
}

#[tokio::test]
async fn test_folder_queries() {
    let (_tmp, store) = sqlite_store().await;
    store.insert_folder(&folder("g", "Guides", "guides", None, 0)).await.unwrap();
    store.insert_folder(&folder("b", "Beta", "beta", Some("g"), 1)).await.unwrap();
    store.insert_folder(&folder("a", "Alpha", "alpha", Some("g"), 1)).await.unwrap();
    store.insert_folder(&folder("z", "Zero", "zero", Some("g"), 0)).await.unwrap();
    // same slug as a root folder, nested and earlier in display order
    store.insert_folder(&folder("n", "Guides", "guides", Some("z"), -1)).await.unwrap();

    let names: Vec<String> = store
        .child_folders("g")
        .await
        .unwrap()
        .into_iter()
        .map(|f| f.name)
        .collect();
    assert_eq!(names, vec!["Zero", "Alpha", "Beta"]);

    assert_eq!(store.folder_by_slug("guides").await.unwrap().unwrap().id, "n");
    assert_eq!(
        store.folder_by_slug_in(None, "guides").await.unwrap().unwrap().id,
        "g"
    );
    assert_eq!(
        store.folder_by_slug_in(Some("z"), "guides").await.unwrap().unwrap().id,
        "n"
    );
    assert!(store.folder_by_slug_in(None, "alpha").await.unwrap().is_none());
    assert!(store.folder_by_id("missing").await.unwrap().is_none());
    assert_eq!(store.list_folders().await.unwrap().len(), 5);
}

#[tokio::test]
async fn test_sibling_slugs_are_unique() {
    let (_tmp, store) = sqlite_store().await;
    store.insert_folder(&folder("g", "Guides", "guides", None, 0)).await.unwrap();

    store.insert_document(&doc_at("Intro", "intro", Some("x"), None, 1)).await.unwrap();
    assert!(store
        .insert_document(&doc_at("Intro again", "intro", Some("y"), None, 2))
        .await
        .is_err());
    store
        .insert_document(&doc_at("Intro", "intro", Some("z"), Some("g"), 3))
        .await
        .unwrap();
    assert!(store
        .insert_document(&doc_at("Intro", "intro", Some("w"), Some("g"), 4))
        .await
        .is_err());

    assert!(store
        .insert_folder(&folder("g2", "Guides", "guides", None, 0))
        .await
        .is_err());
}

#[tokio::test]
async fn test_document_roundtrip_update_delete() {
    let (_tmp, store) = sqlite_store().await;
    let mut pdf = doc_at("Manual", "manual", None, None, 5);
    pdf.file = Some(FileInfo {
        url: "https://files.example/manual.pdf".to_string(),
        mime_type: MIME_PDF.to_string(),
        size_bytes: Some(2048),
    });
    pdf.author_name = Some("Ops".to_string());
    store.insert_document(&pdf).await.unwrap();

    let loaded = store.document_by_slug("manual", None).await.unwrap().unwrap();
    assert_eq!(loaded, pdf);
    assert_eq!(store.pending_pdfs().await.unwrap().len(), 1);

    let mut updated = loaded.clone();
    updated.content = Some("Extracted text".to_string());
    store.update_document(&updated).await.unwrap();
    assert!(store.pending_pdfs().await.unwrap().is_empty());
    assert_eq!(
        store.documents_in_folder(None).await.unwrap()[0].content.as_deref(),
        Some("Extracted text")
    );

    assert!(store.delete_document(&pdf.id).await.unwrap());
    assert!(!store.delete_document(&pdf.id).await.unwrap());
    assert!(store.document_by_slug("manual", None).await.unwrap().is_none());
}

#[tokio::test]
async fn test_search_over_sqlite() {
    let (_tmp, store) = sqlite_store().await;
    store
        .insert_document(&doc_at("Setup", "setup", Some("Install the CLI tool"), None, 1))
        .await
        .unwrap();
    store
        .insert_document(&doc_at("FAQ", "faq", Some("Why setup fails"), None, 2))
        .await
        .unwrap();

    let results = search(&store, "setup", DEFAULT_MAX_RESULTS).await.unwrap();
    let titles: Vec<&str> = results.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(titles, vec!["Setup", "FAQ"]);
    assert_eq!(results[1].match_score, 5);
    assert_eq!(results[1].excerpt, "Why setup fails");
}

#[tokio::test]
async fn test_context_over_sqlite() {
    let (_tmp, store) = sqlite_store().await;
    store.insert_folder(&folder("g", "Guides", "guides", None, 0)).await.unwrap();
    store.insert_folder(&folder("adv", "Advanced", "advanced", Some("g"), 0)).await.unwrap();
    store
        .insert_document(&doc_at("Intro", "intro", Some("Welcome."), Some("g"), 1))
        .await
        .unwrap();
    store
        .insert_document(&doc_at("Tips", "tips", Some("Cache it."), Some("adv"), 2))
        .await
        .unwrap();

    let limits = ContextLimits::default();
    let blob = assemble_context(&store, &ContextSelector::parse("guides"), limits)
        .await
        .unwrap();
    assert_eq!(blob, "## Intro\nWelcome.\n\n---\n\n## Tips\nCache it.");

    let blob = assemble_context(&store, &ContextSelector::parse("guides/tips"), limits)
        .await
        .unwrap();
    assert_eq!(blob, NO_CONTEXT_PLACEHOLDER);
}
