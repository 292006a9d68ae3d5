//! Folder paths and recursive folder resolution.
//!
//! The parent graph of folders is acyclic by contract, but the data comes
//! from an external store, so every walk here carries its own guard: a
//! visited set for the recursive document collection and a seen set for
//! path computation. A depth limit bounds pathological (but acyclic)
//! chains.

use std::collections::{HashMap, HashSet};

use anyhow::Result;
use tracing::warn;

use crate::models::{ContextDocument, Folder};
use crate::store::Store;

/// Default limit on how many levels below the starting folder are visited.
pub const DEFAULT_MAX_FOLDER_DEPTH: usize = 32;

/// Slash-separated folder paths, computed once per pass.
///
/// Each folder's path is its ancestors' slugs joined with `/`, ending in its
/// own slug. Paths are resolved for every folder up front, and each
/// ancestor chain is walked only once.
#[derive(Debug, Clone, Default)]
pub struct FolderPaths {
    paths: HashMap<String, String>,
    slugs: HashMap<String, String>,
}

impl FolderPaths {
    pub fn new(folders: &[Folder]) -> Self {
        let by_id: HashMap<&str, &Folder> = folders.iter().map(|f| (f.id.as_str(), f)).collect();
        let mut paths: HashMap<String, String> = HashMap::with_capacity(folders.len());

        for folder in folders {
            if paths.contains_key(&folder.id) {
                continue;
            }

            let mut chain: Vec<&Folder> = Vec::new();
            let mut seen: HashSet<&str> = HashSet::new();
            let mut base = String::new();
            let mut current = Some(folder);

            while let Some(f) = current {
                if let Some(known) = paths.get(&f.id) {
                    base = known.clone();
                    break;
                }
                if !seen.insert(f.id.as_str()) {
                    warn!(folder_id = %f.id, "folder parent chain loops; truncating path");
                    break;
                }
                chain.push(f);
                current = f
                    .parent_id
                    .as_deref()
                    .and_then(|pid| by_id.get(pid).copied());
            }

            for f in chain.iter().rev() {
                let path = if base.is_empty() {
                    f.slug.clone()
                } else {
                    format!("{}/{}", base, f.slug)
                };
                paths.insert(f.id.clone(), path.clone());
                base = path;
            }
        }

        let slugs = folders
            .iter()
            .map(|f| (f.id.clone(), f.slug.clone()))
            .collect();

        Self { paths, slugs }
    }

    /// Full path of a folder, e.g. `"guides/advanced"`.
    pub fn path_of(&self, folder_id: &str) -> Option<&str> {
        self.paths.get(folder_id).map(String::as_str)
    }

    /// The folder's own slug.
    pub fn slug_of(&self, folder_id: &str) -> Option<&str> {
        self.slugs.get(folder_id).map(String::as_str)
    }

    /// Path of a document: `folder_path/slug`, or just `slug` at the root.
    pub fn document_path(&self, folder_id: Option<&str>, slug: &str) -> String {
        match folder_id.and_then(|id| self.path_of(id)) {
            Some(folder_path) => format!("{}/{}", folder_path, slug),
            None => slug.to_string(),
        }
    }
}

/// Collect every published document with content inside a folder and all
/// of its descendants.
///
/// Traversal is depth-first pre-order: a folder's own documents come before
/// those of its subfolders, and subfolders are visited in store order. Each
/// folder is visited at most once. Folders more than `max_depth` levels
/// below `folder_id` are skipped. An unknown `folder_id` yields an empty list.
pub async fn resolve_folder_documents<S: Store + ?Sized>(
    store: &S,
    folder_id: &str,
    max_depth: usize,
) -> Result<Vec<ContextDocument>> {
    let mut out = Vec::new();
    let mut visited: HashSet<String> = HashSet::new();
    let mut seen_docs: HashSet<String> = HashSet::new();
    let mut stack: Vec<(String, usize)> = vec![(folder_id.to_string(), 0)];

    while let Some((id, depth)) = stack.pop() {
        if depth > max_depth {
            warn!(folder_id = %id, max_depth, "folder depth limit reached; skipping subtree");
            continue;
        }
        if !visited.insert(id.clone()) {
            continue;
        }

        for doc in store.documents_in_folder(Some(&id)).await? {
            if !seen_docs.insert(doc.id.clone()) {
                continue;
            }
            if let Some(text) = doc.text() {
                out.push(ContextDocument {
                    title: doc.title.clone(),
                    content: text.to_string(),
                });
            }
        }

        let children = store.child_folders(&id).await?;
        for child in children.into_iter().rev() {
            if !visited.contains(&child.id) {
                stack.push((child.id, depth + 1));
            }
        }
    }

    Ok(out)
}

/// Locate a folder from path segments, walking from the root with one
/// parent-scoped lookup per segment. A segment that does not match a child
/// of the previous folder yields `None`.
pub async fn locate_folder<S: Store + ?Sized>(
    store: &S,
    segments: &[&str],
) -> Result<Option<Folder>> {
    if segments.is_empty() {
        return Ok(None);
    }

    let mut parent: Option<Folder> = None;
    for segment in segments {
        let parent_id = parent.as_ref().map(|f| f.id.as_str());
        match store.folder_by_slug_in(parent_id, segment).await? {
            Some(folder) => parent = Some(folder),
            None => return Ok(None),
        }
    }
    Ok(parent)
}
