//! # Docs Portal
//!
//! Backend for an internal documentation portal: a folder/document tree in
//! SQLite, deterministic substring search, and a chat assistant that
//! answers from the stored documentation.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌─────────────┐   ┌──────────┐
//! │  Importer  │──▶│ Docs service │──▶│  SQLite  │
//! │ md dirs    │   │ CRUD + PDFs │   │  store   │
//! └────────────┘   └─────────────┘   └────┬─────┘
//!                                         │
//!                   ┌─────────────────────┤
//!                   ▼                     ▼
//!            ┌────────────┐        ┌─────────────┐
//!            │   search   │        │ context +   │──▶ completion
//!            │   ranker   │        │ chat        │    endpoint
//!            └────────────┘        └─────────────┘
//! ```
//!
//! The search, context, and chat logic lives in `docs-portal-core`; this
//! crate supplies storage, the completion client, and the CLI/HTTP surfaces.
//!
//! ## Quick Start
//!
//! ```bash
//! portal init                      # create database
//! portal import ./docs             # ingest a markdown directory
//! portal search "deployment"
//! portal ask "How do I deploy?" --context guides
//! portal serve                     # start HTTP server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`sqlite_store`] | SQLite `Store` implementation |
//! | [`completion`] | OpenAI-compatible completion client |
//! | [`docs`] | Document and folder management, docs tree, PDF processing |
//! | [`import`] | Markdown directory importer |
//! | [`extract`] | Text extraction for attached files |
//! | [`server`] | HTTP API |
//! | [`commands`] | CLI command implementations |

pub mod commands;
pub mod completion;
pub mod config;
pub mod db;
pub mod docs;
pub mod extract;
pub mod import;
pub mod migrate;
pub mod server;
pub mod sqlite_store;
