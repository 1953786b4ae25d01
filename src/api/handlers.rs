//! API Handlers
//!
//! HTTP request handlers for each key-value endpoint.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Bytes,
    extract::{Path, Query, Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use tracing::debug;

use crate::error::Result;
use crate::kv::{KeySelection, KeyValueRepository};
use crate::metrics::{record_http_request, render_metrics};
use crate::models::{parse_entries, DeleteResponse, KeysQuery, PutQuery, PutResponse};
use crate::store::HashStore;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Repository over the shared store
    pub repo: KeyValueRepository,
}

impl AppState {
    /// Creates a new AppState over the given store.
    pub fn new(store: Arc<dyn HashStore>) -> Self {
        Self {
            repo: KeyValueRepository::new(store),
        }
    }

    /// Store handle, for tasks that share it with the handlers.
    pub fn store(&self) -> Arc<dyn HashStore> {
        self.repo.store()
    }
}

// == Reads ==

/// Handler for GET /api/keys
pub async fn get_all_keys(
    State(state): State<AppState>,
    Query(query): Query<KeysQuery>,
) -> Result<Json<BTreeMap<String, String>>> {
    read_keys(&state, KeySelection::All, &query).await
}

/// Handler for GET /api/keys/:id
pub async fn get_key(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<KeysQuery>,
) -> Result<Json<BTreeMap<String, String>>> {
    read_keys(&state, KeySelection::One(id), &query).await
}

async fn read_keys(
    state: &AppState,
    selection: KeySelection,
    query: &KeysQuery,
) -> Result<Json<BTreeMap<String, String>>> {
    let filter = query.key_filter()?;
    let found = state.repo.get_all(&selection, filter.as_ref()).await?;
    Ok(Json(found))
}

// == Writes ==

/// Handler for PUT /api/keys
///
/// Body is a JSON object of key-value pairs; `?expiry=<seconds>` applies a
/// TTL to every key in the batch.
pub async fn put_keys(
    State(state): State<AppState>,
    Query(query): Query<PutQuery>,
    body: Bytes,
) -> Result<Json<PutResponse>> {
    write_keys(&state, &query, &body).await
}

/// Handler for PUT /api/keys/:id
///
/// Same as [`put_keys`]; the keys come from the body, not the path.
pub async fn put_keys_at(
    State(state): State<AppState>,
    Path(_id): Path<String>,
    Query(query): Query<PutQuery>,
    body: Bytes,
) -> Result<Json<PutResponse>> {
    write_keys(&state, &query, &body).await
}

async fn write_keys(state: &AppState, query: &PutQuery, body: &[u8]) -> Result<Json<PutResponse>> {
    let entries = parse_entries(body)?;
    let ttl = query.ttl_secs()?;
    state.repo.put(&entries, ttl).await?;
    Ok(Json(PutResponse::new(entries.len(), ttl)))
}

// == Deletes ==

/// Handler for DELETE /api/keys
pub async fn delete_all_keys(State(state): State<AppState>) -> Result<Json<DeleteResponse>> {
    let deleted = state.repo.delete(&KeySelection::All).await?;
    Ok(Json(DeleteResponse::new(deleted)))
}

/// Handler for DELETE /api/keys/:id
pub async fn delete_key(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>> {
    let deleted = state.repo.delete(&KeySelection::One(id)).await?;
    Ok(Json(DeleteResponse::new(deleted)))
}

// == Presence ==

/// Handler for HEAD /api/keys
pub async fn head_all_keys(State(state): State<AppState>) -> Result<StatusCode> {
    presence(&state, KeySelection::All).await
}

/// Handler for HEAD /api/keys/:id
pub async fn head_key(State(state): State<AppState>, Path(id): Path<String>) -> Result<StatusCode> {
    presence(&state, KeySelection::One(id)).await
}

async fn presence(state: &AppState, selection: KeySelection) -> Result<StatusCode> {
    if state.repo.check_presence(&selection).await? {
        Ok(StatusCode::OK)
    } else {
        debug!("Presence check failed for {:?}", selection);
        Ok(StatusCode::NOT_FOUND)
    }
}

// == Operational ==

/// Handler for GET /health
pub async fn health_handler() -> StatusCode {
    StatusCode::NO_CONTENT
}

/// Handler for GET /metrics
pub async fn metrics_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        [(
            header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        render_metrics(),
    )
}

/// Records request count and latency for every request.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;

    record_http_request(
        &method,
        &path,
        response.status().as_u16(),
        start.elapsed().as_secs_f64(),
    );
    response
}
