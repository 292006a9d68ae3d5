//! HTTP API server.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`    | `/health` | Health check (returns version) |
//! | `GET`    | `/api/search?q=` | Ranked document search |
//! | `POST`   | `/api/chat` | Answer a question from the documentation |
//! | `GET`    | `/api/docs` | All published documents |
//! | `POST`   | `/api/docs` | Create a document |
//! | `DELETE` | `/api/docs` | Delete a document by path |
//! | `PUT`    | `/api/docs/update` | Replace a document's content |
//! | `POST`   | `/api/docs/upload` | Create or update from uploaded markdown |
//! | `POST`   | `/api/docs/process-pdfs` | Extract text for pending PDFs |
//! | `GET`    | `/api/docs/{*path}` | One document with headings |
//! | `POST`   | `/api/folders` | Create a folder |
//! | `GET`    | `/api/tree` | Navigation tree |
//!
//! The static `/api/docs/<name>` routes win over the wildcard, so root
//! documents may not use those names (see [`crate::docs::RESERVED_ROOT_SLUGS`]).
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "message is required" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `conflict` (409),
//! `config` (500), `internal` (500), `upstream` (502).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted for browser clients.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

use docs_portal_core::chat::{ChatError, ChatOrchestrator, ChatRequest, CompletionClient};
use docs_portal_core::models::{ChatMessage, SearchResult, TreeNode};
use docs_portal_core::search::search;
use docs_portal_core::store::Store;

use crate::completion::OpenAiCompatibleClient;
use crate::config::Config;
use crate::db;
use crate::docs::{self, DocsError, DocumentView, FileFetcher, HttpFileFetcher, NewDocument, UploadedDocument};
use crate::sqlite_store::SqliteStore;

/// Message returned to clients whenever a chat turn fails upstream.
pub const CHAT_FAILURE_MESSAGE: &str = "Sorry, something went wrong while processing your request.";

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn Store>,
    pub completion: Arc<dyn CompletionClient>,
    pub fetcher: Arc<dyn FileFetcher>,
}

/// Build the router with all routes and CORS.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/api/search", get(handle_search))
        .route("/api/chat", post(handle_chat))
        .route(
            "/api/docs",
            get(handle_list_docs)
                .post(handle_create_doc)
                .delete(handle_delete_doc),
        )
        .route("/api/docs/update", put(handle_update_doc))
        .route("/api/docs/upload", post(handle_upload_doc))
        .route("/api/docs/process-pdfs", post(handle_process_pdfs))
        .route("/api/docs/{*path}", get(handle_get_doc))
        .route("/api/folders", post(handle_create_folder))
        .route("/api/tree", get(handle_tree))
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server on `[server].bind`. Runs until the process exits.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let pool = db::connect(config).await?;
    let state = AppState {
        config: Arc::new(config.clone()),
        store: Arc::new(SqliteStore::new(pool)),
        completion: Arc::new(OpenAiCompatibleClient::new(&config.chat)?),
        fetcher: Arc::new(HttpFileFetcher::new(config.chat.timeout_secs)?),
    };

    let bind_addr = config.server.bind.clone();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(addr = %bind_addr, "docs portal listening");
    axum::serve(listener, router(state)).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Error type that converts into a JSON HTTP response.
pub struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl AppError {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError::new(StatusCode::BAD_REQUEST, "bad_request", message)
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError::new(StatusCode::NOT_FOUND, "not_found", message)
}

impl From<DocsError> for AppError {
    fn from(err: DocsError) -> Self {
        match err {
            DocsError::Validation(msg) => bad_request(msg),
            DocsError::NotFound(msg) => not_found(msg),
            DocsError::Conflict(msg) => AppError::new(StatusCode::CONFLICT, "conflict", msg),
            DocsError::Store(e) => {
                error!(error = %e, "store operation failed");
                AppError::new(StatusCode::INTERNAL_SERVER_ERROR, "internal", "internal error")
            }
        }
    }
}

impl From<ChatError> for AppError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::EmptyMessage => bad_request("message is required"),
            ChatError::Configuration(_) => AppError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "config",
                CHAT_FAILURE_MESSAGE,
            ),
            ChatError::Upstream(_) => {
                AppError::new(StatusCode::BAD_GATEWAY, "upstream", CHAT_FAILURE_MESSAGE)
            }
        }
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ GET /api/search ============

#[derive(Deserialize)]
struct SearchParams {
    #[serde(default)]
    q: Option<String>,
}

#[derive(Serialize)]
struct SearchResponse {
    results: Vec<SearchResult>,
}

/// Search never fails from the client's point of view: store errors are
/// logged and reported as no results.
async fn handle_search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Json<SearchResponse> {
    let query = params.q.unwrap_or_default();
    let results = match search(state.store.as_ref(), &query, state.config.search.max_results).await {
        Ok(results) => results,
        Err(e) => {
            warn!(error = %e, "search failed");
            Vec::new()
        }
    };
    Json(SearchResponse { results })
}

// ============ POST /api/chat ============

#[derive(Deserialize)]
struct ChatBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    context: Option<String>,
    #[serde(default)]
    history: Vec<ChatMessage>,
}

#[derive(Serialize)]
struct ChatResponse {
    response: String,
}

async fn handle_chat(
    State(state): State<AppState>,
    Json(body): Json<ChatBody>,
) -> Result<Json<ChatResponse>, AppError> {
    let settings = state.config.chat_settings();
    let chat = ChatOrchestrator::new(state.store.as_ref(), state.completion.as_ref(), &settings);
    let request = ChatRequest {
        message: body.message,
        context: body.context.unwrap_or_default(),
        history: body.history,
    };
    let response = chat.reply(&request).await?;
    Ok(Json(ChatResponse { response }))
}

// ============ /api/docs ============

#[derive(Serialize)]
struct DocsResponse {
    docs: Vec<DocumentView>,
}

async fn handle_list_docs(State(state): State<AppState>) -> Result<Json<DocsResponse>, AppError> {
    let docs = docs::list_documents(state.store.as_ref()).await?;
    Ok(Json(DocsResponse { docs }))
}

async fn handle_get_doc(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Result<Json<DocumentView>, AppError> {
    docs::get_document(state.store.as_ref(), &path)
        .await?
        .map(Json)
        .ok_or_else(|| not_found(format!("document not found: {}", path)))
}

#[derive(Deserialize)]
struct CreateDocBody {
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    folder: Option<String>,
}

#[derive(Serialize)]
struct PathResponse {
    success: bool,
    path: String,
}

async fn handle_create_doc(
    State(state): State<AppState>,
    Json(body): Json<CreateDocBody>,
) -> Result<Json<PathResponse>, AppError> {
    let input = NewDocument {
        title: body.title,
        content: body.content,
        folder: body.folder,
    };
    let path = docs::create_document(state.store.as_ref(), &input).await?;
    Ok(Json(PathResponse {
        success: true,
        path,
    }))
}

#[derive(Deserialize)]
struct DeleteDocBody {
    #[serde(default)]
    path: String,
}

#[derive(Serialize)]
struct SuccessResponse {
    success: bool,
}

async fn handle_delete_doc(
    State(state): State<AppState>,
    Json(body): Json<DeleteDocBody>,
) -> Result<Json<SuccessResponse>, AppError> {
    docs::delete_document(state.store.as_ref(), &body.path).await?;
    Ok(Json(SuccessResponse { success: true }))
}

#[derive(Deserialize)]
struct UpdateDocBody {
    #[serde(default)]
    path: String,
    #[serde(default)]
    content: String,
}

async fn handle_update_doc(
    State(state): State<AppState>,
    Json(body): Json<UpdateDocBody>,
) -> Result<Json<PathResponse>, AppError> {
    docs::update_document(state.store.as_ref(), &body.path, &body.content).await?;
    Ok(Json(PathResponse {
        success: true,
        path: body.path,
    }))
}

#[derive(Deserialize)]
struct UploadBody {
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    folder: Option<String>,
    #[serde(default)]
    filename: Option<String>,
}

async fn handle_upload_doc(
    State(state): State<AppState>,
    Json(body): Json<UploadBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    let input = UploadedDocument {
        title: body.title,
        content: body.content,
        folder: body.folder,
        filename: body.filename,
    };
    let outcome = docs::upload_document(state.store.as_ref(), &input).await?;
    let flag = if outcome.created { "created" } else { "updated" };
    let mut response = serde_json::json!({
        "success": true,
        "path": outcome.path,
    });
    response[flag] = serde_json::Value::Bool(true);
    Ok(Json(response))
}

async fn handle_process_pdfs(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let report = docs::process_pending_pdfs(state.store.as_ref(), state.fetcher.as_ref()).await?;
    let message = if report.total == 0 {
        "No PDFs to process".to_string()
    } else {
        format!("Processed {} PDFs, {} errors", report.processed, report.errors)
    };
    Ok(Json(serde_json::json!({
        "message": message,
        "processed": report.processed,
        "errors": report.errors,
        "total": report.total,
    })))
}

// ============ /api/folders, /api/tree ============

#[derive(Deserialize)]
struct CreateFolderBody {
    #[serde(default)]
    name: String,
    #[serde(default)]
    parent: Option<String>,
}

#[derive(Serialize)]
struct FolderResponse {
    success: bool,
    slug: String,
}

async fn handle_create_folder(
    State(state): State<AppState>,
    Json(body): Json<CreateFolderBody>,
) -> Result<Json<FolderResponse>, AppError> {
    let folder =
        docs::create_folder(state.store.as_ref(), &body.name, body.parent.as_deref()).await?;
    Ok(Json(FolderResponse {
        success: true,
        slug: folder.slug,
    }))
}

#[derive(Serialize)]
struct TreeResponse {
    tree: Vec<TreeNode>,
}

async fn handle_tree(State(state): State<AppState>) -> Result<Json<TreeResponse>, AppError> {
    let tree = docs::docs_tree(state.store.as_ref()).await?;
    Ok(Json(TreeResponse { tree }))
}
