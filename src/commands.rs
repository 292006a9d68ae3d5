//! CLI command implementations.
//!
//! Each `run_*` function opens the configured database, performs one
//! operation, and prints human-readable output to stdout.

use anyhow::Result;
use std::path::Path;

use docs_portal_core::chat::{ChatOrchestrator, ChatRequest};
use docs_portal_core::context::{assemble_context, ContextSelector};
use docs_portal_core::models::{NodeKind, TreeNode};
use docs_portal_core::search::search;

use crate::completion::OpenAiCompatibleClient;
use crate::config::Config;
use crate::db;
use crate::docs::{self, HttpFileFetcher};
use crate::import::import_directory;
use crate::sqlite_store::SqliteStore;

async fn open_store(config: &Config) -> Result<SqliteStore> {
    Ok(SqliteStore::new(db::connect(config).await?))
}

pub async fn run_search(config: &Config, query: &str, limit: Option<usize>) -> Result<()> {
    let store = open_store(config).await?;
    let limit = limit.unwrap_or(config.search.max_results);
    let results = search(&store, query, limit).await?;

    if results.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, r) in results.iter().enumerate() {
        let path = if r.folder.is_empty() {
            r.slug.clone()
        } else {
            format!("{}/{}", r.folder, r.slug)
        };
        println!("{}. [{}] {} ({})", i + 1, r.match_score, r.title, path);
        if !r.excerpt.is_empty() {
            println!("    {}", r.excerpt.replace('\n', " "));
        }
    }
    Ok(())
}

pub async fn run_ask(config: &Config, message: &str, context: &str) -> Result<()> {
    let store = open_store(config).await?;
    let client = OpenAiCompatibleClient::new(&config.chat)?;
    let settings = config.chat_settings();
    let chat = ChatOrchestrator::new(&store, &client, &settings);

    let answer = chat
        .reply(&ChatRequest {
            message: message.to_string(),
            context: context.to_string(),
            history: Vec::new(),
        })
        .await?;
    println!("{}", answer);
    Ok(())
}

pub async fn run_context(config: &Config, selector: &str) -> Result<()> {
    let store = open_store(config).await?;
    let blob = assemble_context(
        &store,
        &ContextSelector::parse(selector),
        config.context.limits(),
    )
    .await?;
    println!("{}", blob);
    Ok(())
}

pub async fn run_tree(config: &Config) -> Result<()> {
    let store = open_store(config).await?;
    let tree = docs::docs_tree(&store).await?;
    if tree.is_empty() {
        println!("No documents.");
    }
    print_nodes(&tree, 0);
    Ok(())
}

fn print_nodes(nodes: &[TreeNode], depth: usize) {
    for node in nodes {
        let marker = match node.kind {
            NodeKind::Folder => "/",
            NodeKind::File => "",
        };
        println!("{}{}{}  ({})", "  ".repeat(depth), node.name, marker, node.path);
        print_nodes(&node.children, depth + 1);
    }
}

pub async fn run_import(config: &Config, root: &Path) -> Result<()> {
    let store = open_store(config).await?;
    let report = import_directory(&store, root, &config.import).await?;
    println!(
        "Imported {}: {} folders created, {} documents created, {} updated, {} skipped",
        root.display(),
        report.folders_created,
        report.documents_created,
        report.documents_updated,
        report.skipped
    );
    Ok(())
}

pub async fn run_process_pdfs(config: &Config) -> Result<()> {
    let store = open_store(config).await?;
    let fetcher = HttpFileFetcher::new(config.chat.timeout_secs)?;
    let report = docs::process_pending_pdfs(&store, &fetcher).await?;
    println!(
        "Processed {} PDFs, {} errors ({} pending)",
        report.processed, report.errors, report.total
    );
    Ok(())
}
