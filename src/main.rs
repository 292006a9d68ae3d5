//! # Docs Portal CLI (`portal`)
//!
//! ## Usage
//!
//! ```bash
//! portal --config ./config/portal.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `portal init` | Create the SQLite database and run schema migrations |
//! | `portal serve` | Start the HTTP API server |
//! | `portal search "<query>"` | Search published documents |
//! | `portal ask "<message>"` | Ask the documentation assistant |
//! | `portal context <selector>` | Print the context blob for a selector |
//! | `portal tree` | Print the docs tree |
//! | `portal import <dir>` | Import a directory of markdown files |
//! | `portal process-pdfs` | Extract text for PDFs that have none yet |
//!
//! Logging goes to stderr and is controlled with `RUST_LOG` (default `info`).

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use docs_portal::{commands, config, migrate, server};

#[derive(Parser)]
#[command(
    name = "portal",
    about = "Docs Portal: documentation tree, search, and documentation-grounded chat",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// See `config/portal.example.toml` for a full example.
    #[arg(long, global = true, default_value = "./config/portal.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Safe to run repeatedly.
    Init,

    /// Start the HTTP API server on `[server].bind`.
    Serve,

    /// Search published documents by substring.
    Search {
        query: String,

        /// Maximum number of results (defaults to `[search].max_results`).
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Ask a question answered from the documentation.
    Ask {
        message: String,

        /// Context selector: `all`, a folder or root document slug, or `folder/doc`.
        #[arg(long, default_value = "all")]
        context: String,
    },

    /// Print the context blob a selector resolves to.
    Context {
        #[arg(default_value = "all")]
        selector: String,
    },

    /// Print the navigation tree.
    Tree,

    /// Import a directory of markdown files as folders and documents.
    Import { dir: PathBuf },

    /// Extract text for published PDFs that have no content yet.
    ProcessPdfs,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Search { query, limit } => {
            commands::run_search(&cfg, &query, limit).await?;
        }
        Commands::Ask { message, context } => {
            commands::run_ask(&cfg, &message, &context).await?;
        }
        Commands::Context { selector } => {
            commands::run_context(&cfg, &selector).await?;
        }
        Commands::Tree => {
            commands::run_tree(&cfg).await?;
        }
        Commands::Import { dir } => {
            commands::run_import(&cfg, &dir).await?;
        }
        Commands::ProcessPdfs => {
            commands::run_process_pdfs(&cfg).await?;
        }
    }

    Ok(())
}
