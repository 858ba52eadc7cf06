//! HTTP front end.
//!
//! | Route                          | Response                          |
//! |--------------------------------|-----------------------------------|
//! | `GET /add?t=<title>&c=<text>`  | `{"doc_id": n}`                   |
//! | `GET /search?w=<query>&k=<n>`  | JSON array of hits, best first    |
//! | `GET /documents/:id`           | the document, or 404              |
//! | `GET /stats`                   | index counters                    |
//!
//! Index work runs on the blocking thread pool so a long write transaction
//! never stalls the reactor.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::NgramdexError;
use crate::index::document::{DocId, Document};
use crate::index::store::IndexStats;
use crate::search::engine::{SearchHit, SearchRequest};
use crate::search::scorer::ScoringMode;
use crate::service::SearchService;

/// Error returned by request handlers, rendered as `{"error": "..."}`.
#[derive(Debug)]
pub enum ApiError {
    /// 400
    BadRequest(String),
    /// 404
    NotFound(String),
    /// 500
    Internal(String),
}

impl From<NgramdexError> for ApiError {
    fn from(err: NgramdexError) -> Self {
        match err {
            NgramdexError::NotFound(msg) => ApiError::NotFound(msg),
            NgramdexError::Configuration(msg) => ApiError::BadRequest(msg),
            other => {
                error!("request failed: {other}");
                ApiError::Internal(other.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct AddParams {
    pub t: String,
    pub c: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AddResponse {
    pub doc_id: DocId,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub w: String,
    pub k: Option<usize>,
    pub mode: Option<String>,
}

/// Run blocking index work off the async reactor.
async fn blocking<T, F>(work: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce() -> crate::error::Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ApiError::Internal(format!("worker task failed: {e}")))?
        .map_err(ApiError::from)
}

async fn handle_add(
    State(service): State<Arc<SearchService>>,
    Query(params): Query<AddParams>,
) -> Result<Json<AddResponse>, ApiError> {
    let doc_id = blocking(move || service.add(&params.t, &params.c)).await?;
    debug!("http: added document {doc_id}");
    Ok(Json(AddResponse { doc_id }))
}

async fn handle_search(
    State(service): State<Arc<SearchService>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<SearchHit>>, ApiError> {
    let mut request = SearchRequest::new(params.w);
    if let Some(k) = params.k {
        request = request.with_top_k(k);
    }
    if let Some(mode) = params.mode {
        request = request.with_mode(mode.parse::<ScoringMode>()?);
    }
    let hits = blocking(move || service.search(&request)).await?;
    Ok(Json(hits))
}

async fn handle_get_document(
    State(service): State<Arc<SearchService>>,
    Path(id): Path<DocId>,
) -> Result<Json<Document>, ApiError> {
    match blocking(move || service.get(id)).await? {
        Some(document) => Ok(Json(document)),
        None => Err(ApiError::NotFound(format!("document {id} not found"))),
    }
}

async fn handle_stats(State(service): State<Arc<SearchService>>) -> Json<IndexStats> {
    Json(service.stats())
}

/// Build the router over a shared service.
pub fn create_router(service: Arc<SearchService>) -> Router {
    Router::new()
        .route("/add", get(handle_add))
        .route("/search", get(handle_search))
        .route("/documents/:id", get(handle_get_document))
        .route("/stats", get(handle_stats))
        .with_state(service)
}

/// Serve until Ctrl-C, then close the index.
pub async fn serve(service: Arc<SearchService>, addr: SocketAddr) -> crate::error::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("serving {} index on http://{}", service.tokenizer(), listener.local_addr()?);

    axum::serve(listener, create_router(service.clone()))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
        })
        .await?;

    let closing = service.clone();
    tokio::task::spawn_blocking(move || closing.close())
        .await
        .map_err(|e| NgramdexError::other(format!("close task failed: {e}")))?
}
