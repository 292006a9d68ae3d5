//! Schema migrations.
//!
//! Every statement is idempotent, so `portal init` can be run repeatedly.
//! Slug uniqueness among siblings is enforced by two partial indexes per
//! table: SQLite treats NULLs as distinct in a plain UNIQUE constraint, so
//! the root scope (`NULL` parent) needs its own index.

use anyhow::Result;
use sqlx::SqlitePool;
use tracing::info;

use crate::config::Config;
use crate::db;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS folders (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        slug TEXT NOT NULL,
        parent_id TEXT REFERENCES folders(id) ON DELETE CASCADE,
        icon TEXT,
        display_order INTEGER NOT NULL DEFAULT 0,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS documents (
        id TEXT PRIMARY KEY,
        title TEXT NOT NULL,
        slug TEXT NOT NULL,
        content TEXT,
        folder_id TEXT REFERENCES folders(id) ON DELETE SET NULL,
        is_published INTEGER NOT NULL DEFAULT 1,
        file_url TEXT,
        file_type TEXT,
        file_size INTEGER,
        author_name TEXT,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL
    )
    "#,
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_folders_sibling_slug ON folders(parent_id, slug) WHERE parent_id IS NOT NULL",
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_folders_root_slug ON folders(slug) WHERE parent_id IS NULL",
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_documents_folder_slug ON documents(folder_id, slug) WHERE folder_id IS NOT NULL",
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_documents_root_slug ON documents(slug) WHERE folder_id IS NULL",
    "CREATE INDEX IF NOT EXISTS idx_folders_slug ON folders(slug)",
    "CREATE INDEX IF NOT EXISTS idx_documents_updated_at ON documents(updated_at DESC)",
];

/// Connect to the configured database and apply the schema.
pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    apply_schema(&pool).await?;
    pool.close().await;
    info!(path = %config.db.path.display(), "database schema up to date");
    Ok(())
}

/// Apply the schema on an existing pool.
pub async fn apply_schema(pool: &SqlitePool) -> Result<()> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}
