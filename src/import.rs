//! Markdown directory importer.
//!
//! Mirrors a directory tree into the store: each directory becomes a folder
//! nested under its parent directory's folder, and each matching file
//! becomes a published document. Re-importing the same tree updates
//! documents in place instead of duplicating them.
//!
//! Titles come from `title:` in a `---` frontmatter block, else the first
//! `# ` heading, else the file stem.

use anyhow::{bail, Context, Result};
use chrono::Utc;
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use docs_portal_core::models::{Document, Folder};
use docs_portal_core::slug::{first_heading_title, slugify, title_from_slug};
use docs_portal_core::store::Store;

use crate::config::ImportConfig;
use crate::docs::is_reserved_root_slug;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub folders_created: usize,
    pub documents_created: usize,
    pub documents_updated: usize,
    pub skipped: usize,
}

/// Frontmatter fields the importer understands.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frontmatter {
    pub title: Option<String>,
    pub author: Option<String>,
}

/// Split an optional `---` frontmatter block from the markdown body.
///
/// Returns the parsed fields and the body without the block. Unknown keys
/// are ignored. Text without a closing `---` line is treated as all body.
pub fn split_frontmatter(text: &str) -> (Frontmatter, &str) {
    let Some(rest) = text
        .strip_prefix("---\n")
        .or_else(|| text.strip_prefix("---\r\n"))
    else {
        return (Frontmatter::default(), text);
    };

    let mut meta = Frontmatter::default();
    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        offset += line.len();
        let trimmed = line.trim();
        if trimmed == "---" {
            return (meta, &rest[offset..]);
        }
        if let Some((key, value)) = trimmed.split_once(':') {
            let value = value.trim().trim_matches(|c| c == '"' || c == '\'').to_string();
            if value.is_empty() {
                continue;
            }
            match key.trim() {
                "title" => meta.title = Some(value),
                "author" => meta.author = Some(value),
                _ => {}
            }
        }
    }

    (Frontmatter::default(), text)
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

/// Matching files under `root`, relative paths in sorted order.
fn collect_files(root: &Path, config: &ImportConfig) -> Result<Vec<PathBuf>> {
    let include_set = build_globset(&config.include_globs)?;

    let mut excludes = vec![
        "**/.git/**".to_string(),
        "**/target/**".to_string(),
        "**/node_modules/**".to_string(),
    ];
    excludes.extend(config.exclude_globs.iter().cloned());
    let exclude_set = build_globset(&excludes)?;

    let mut files = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
        let rel_str = relative.to_string_lossy().replace('\\', "/");
        if exclude_set.is_match(&rel_str) || !include_set.is_match(&rel_str) {
            continue;
        }
        files.push(relative.to_path_buf());
    }

    files.sort();
    Ok(files)
}

/// Import every matching file under `root` into the store.
pub async fn import_directory<S: Store + ?Sized>(
    store: &S,
    root: &Path,
    config: &ImportConfig,
) -> Result<ImportReport> {
    if !root.is_dir() {
        bail!("import root is not a directory: {}", root.display());
    }

    let files = collect_files(root, config)?;
    info!(root = %root.display(), files = files.len(), "importing markdown directory");

    let mut report = ImportReport::default();
    // relative directory path -> folder id
    let mut folder_ids: HashMap<PathBuf, String> = HashMap::new();

    for relative in files {
        let folder_id = match relative.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(dir) => Some(ensure_folder(store, dir, &mut folder_ids, &mut report).await?),
            None => None,
        };

        let path = root.join(&relative);
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping unreadable file");
                report.skipped += 1;
                continue;
            }
        };

        let stem = relative
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let slug = slugify(&stem);
        if slug.is_empty() {
            warn!(path = %path.display(), "file name does not produce a slug; skipping");
            report.skipped += 1;
            continue;
        }
        if folder_id.is_none() && is_reserved_root_slug(&slug) {
            warn!(path = %path.display(), slug = %slug, "slug is reserved at the root; skipping");
            report.skipped += 1;
            continue;
        }

        let (meta, body) = split_frontmatter(&text);
        let title = meta
            .title
            .clone()
            .or_else(|| first_heading_title(body))
            .unwrap_or_else(|| title_from_slug(&slug));

        match store.document_by_slug(&slug, folder_id.as_deref()).await? {
            Some(mut existing) => {
                existing.title = title;
                existing.content = Some(body.to_string());
                existing.author_name = meta.author.or(existing.author_name);
                existing.updated_at = Utc::now().timestamp();
                store.update_document(&existing).await?;
                report.documents_updated += 1;
            }
            None => {
                let mut doc = Document::new(&title, &slug, Some(body), folder_id.as_deref());
                doc.author_name = meta.author;
                store
                    .insert_document(&doc)
                    .await
                    .with_context(|| format!("Failed to import {}", relative.display()))?;
                report.documents_created += 1;
            }
        }
        debug!(file = %relative.display(), slug = %slug, "imported");
    }

    info!(
        folders_created = report.folders_created,
        documents_created = report.documents_created,
        documents_updated = report.documents_updated,
        skipped = report.skipped,
        "import finished"
    );
    Ok(report)
}

/// Folder id for a relative directory, creating it and its ancestors as needed.
async fn ensure_folder<S: Store + ?Sized>(
    store: &S,
    dir: &Path,
    cache: &mut HashMap<PathBuf, String>,
    report: &mut ImportReport,
) -> Result<String> {
    if let Some(id) = cache.get(dir) {
        return Ok(id.clone());
    }

    let mut parent_id: Option<String> = None;
    let mut current = PathBuf::new();
    for component in dir.components() {
        current.push(component);
        if let Some(id) = cache.get(&current) {
            parent_id = Some(id.clone());
            continue;
        }

        let name = component.as_os_str().to_string_lossy();
        let slug = slugify(&name);
        if slug.is_empty() {
            bail!("directory name does not produce a slug: {}", current.display());
        }

        let folder = match store.folder_by_slug_in(parent_id.as_deref(), &slug).await? {
            Some(existing) => existing,
            None => {
                let folder = Folder::new(&title_from_slug(&slug), &slug, parent_id.as_deref());
                store.insert_folder(&folder).await?;
                report.folders_created += 1;
                folder
            }
        };
        cache.insert(current.clone(), folder.id.clone());
        parent_id = Some(folder.id);
    }

    parent_id.ok_or_else(|| anyhow::anyhow!("empty directory path"))
}
