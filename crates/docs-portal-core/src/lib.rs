//! # Docs Portal Core
//!
//! Runtime-agnostic logic for Docs Portal: data models, the store
//! abstraction, folder resolution, search ranking, chat context assembly,
//! and chat orchestration against a pluggable completion client.
//!
//! This crate contains no sqlx, axum, reqwest, or filesystem I/O. The
//! application crate supplies a SQLite [`store::Store`] and an HTTP
//! [`chat::CompletionClient`].
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`models`] | `Document`, `Folder`, `SearchResult`, `TreeNode`, chat messages |
//! | [`store`] | `Store` trait and the in-memory implementation |
//! | [`slug`] | Slugs, titles, and markdown heading extraction |
//! | [`folders`] | Folder paths and recursive folder document collection |
//! | [`search`] | Substring search with scoring and excerpts |
//! | [`context`] | Context selector parsing and context blob assembly |
//! | [`chat`] | System prompt, history window, single-shot completion |

pub mod chat;
pub mod context;
pub mod folders;
pub mod models;
pub mod search;
pub mod slug;
pub mod store;
