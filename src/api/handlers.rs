//! API Handlers
//!
//! HTTP request handlers for each cache admin endpoint.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderName, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use crate::cache::CacheManager;
use crate::error::{CacheError, Result};
use crate::fetch::RequestOptions;
use crate::models::requests::validate_key;
use crate::models::{
    DeleteResponse, EntryResponse, FetchQuery, HealthResponse, RemovedResponse, SetEntryRequest,
    SetResponse, StatsResponse,
};

/// Header telling clients whether a fetch was served from the cache.
pub const X_CACHE: HeaderName = HeaderName::from_static("x-cache");

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Shared cache manager
    pub cache: Arc<CacheManager>,
}

impl AppState {
    pub fn new(cache: Arc<CacheManager>) -> Self {
        Self { cache }
    }
}

/// Runs a store operation on the blocking pool.
///
/// A file-backed store rewrites its file under the store lock, which must
/// not stall the async workers.
async fn run_blocking<T, F>(cache: Arc<CacheManager>, op: F) -> Result<T>
where
    F: FnOnce(&CacheManager) -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(move || op(cache.as_ref()))
        .await
        .map_err(|e| CacheError::Internal(e.to_string()))
}

/// Handler for GET /fetch
///
/// Read-through fetch of an upstream path. Relays the upstream status and
/// body, and marks the response with `x-cache: HIT` or `MISS`.
pub async fn fetch_handler(
    State(state): State<AppState>,
    Query(query): Query<FetchQuery>,
) -> Result<Response> {
    if let Some(error_msg) = query.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let response = state
        .cache
        .cached_fetch(
            &query.url,
            &RequestOptions::get(),
            query.key.as_deref(),
            query.ttl.map(Duration::from_secs),
        )
        .await?;

    let status = StatusCode::from_u16(response.status)
        .map_err(|e| CacheError::Internal(e.to_string()))?;
    let content_type = response
        .header("content-type")
        .unwrap_or("application/json")
        .to_string();
    let cache_status = if response.cached { "HIT" } else { "MISS" };

    Ok((
        status,
        [
            (header::CONTENT_TYPE, content_type),
            (X_CACHE, cache_status.to_string()),
        ],
        response.bytes(),
    )
        .into_response())
}

/// Handler for GET /entries/:key
pub async fn get_entry_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<EntryResponse>> {
    let lookup = key.clone();
    let entry = run_blocking(state.cache, move |cache| cache.get_entry(&lookup))
        .await?
        .ok_or_else(|| CacheError::NotFound(key.clone()))?;

    Ok(Json(EntryResponse::new(key, entry)))
}

/// Handler for PUT /entries/:key
///
/// A write the store rejects is still a 200; `stored` reports the outcome.
pub async fn set_entry_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(req): Json<SetEntryRequest>,
) -> Result<Json<SetResponse>> {
    if let Some(error_msg) = validate_key(&key) {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let target = key.clone();
    let stored = run_blocking(state.cache, move |cache| {
        cache.set(&target, req.data, req.ttl.map(Duration::from_secs))
    })
    .await?;

    Ok(Json(SetResponse::new(key, stored)))
}

/// Handler for DELETE /entries/:key
pub async fn delete_entry_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<DeleteResponse>> {
    let target = key.clone();
    run_blocking(state.cache, move |cache| cache.remove(&target)).await?;
    Ok(Json(DeleteResponse::new(key)))
}

/// Handler for POST /invalidate/:key
///
/// Removes the key and every category depending on it.
pub async fn invalidate_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<RemovedResponse>> {
    let removed = run_blocking(state.cache, move |cache| cache.invalidate(&key)).await?;
    Ok(Json(RemovedResponse::new(removed)))
}

/// Handler for DELETE /entries
pub async fn clear_handler(State(state): State<AppState>) -> Result<Json<RemovedResponse>> {
    let removed = run_blocking(state.cache, CacheManager::clear_all).await?;
    Ok(Json(RemovedResponse::new(removed)))
}

/// Handler for POST /sweep
pub async fn sweep_handler(State(state): State<AppState>) -> Result<Json<RemovedResponse>> {
    let removed = run_blocking(state.cache, CacheManager::sweep_expired).await?;
    Ok(Json(RemovedResponse::new(removed)))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Result<Json<StatsResponse>> {
    let stats = run_blocking(state.cache, CacheManager::stats).await?;
    Ok(Json(StatsResponse::from(stats)))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
