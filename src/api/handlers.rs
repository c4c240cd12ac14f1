//! API Handlers
//!
//! HTTP request handlers for each cache admin endpoint.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::cache::CacheMetrics;
use crate::engine::CacheEngine;
use crate::error::{CacheError, Result};
use crate::models::{
    DeleteResponse, GetResponse, HealthResponse, InvalidatePatternRequest, InvalidateResponse,
    InvalidateTagsRequest, ProviderQuery, ProvidersResponse, SetRequest, SetResponse,
};
use crate::provider::{EntryOptions, DEFAULT_PROVIDER};

/// Application state shared across all handlers.
///
/// The engine is internally synchronized, so handlers share it through a
/// plain `Arc` without an outer lock.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<CacheEngine>,
}

impl AppState {
    /// Creates a new AppState around a running or stopped engine.
    pub fn new(engine: Arc<CacheEngine>) -> Self {
        Self { engine }
    }

    /// Creates a new AppState from configuration.
    ///
    /// The engine is not started; callers decide when background work begins.
    pub fn from_config(config: crate::config::Config) -> Self {
        Self::new(Arc::new(CacheEngine::new(config)))
    }
}

/// Handler for PUT /set
///
/// Stores any JSON value with optional TTL, tags and provider.
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    // Validate request
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let provider = state.engine.get_cache_provider(req.provider.as_deref())?;
    let ttl = req
        .ttl
        .map(Duration::from_secs)
        .unwrap_or(state.engine.config().default_ttl);
    let options = EntryOptions::new().with_ttl(ttl).with_tags(req.tags);
    provider.set(&req.key, req.value, options).await?;

    Ok(Json(SetResponse::new(req.key)))
}

/// Handler for GET /get/:key
///
/// Returns the value with its age, remaining TTL and tags.
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(query): Query<ProviderQuery>,
) -> Result<Json<GetResponse>> {
    let item = state
        .engine
        .get_with_metadata(&key, query.provider.as_deref())
        .await?
        .ok_or_else(|| CacheError::NotFound(key.clone()))?;

    let now = state.engine.clock().now();
    Ok(Json(GetResponse::from_item(key, &item, now)))
}

/// Handler for DELETE /del/:key
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(query): Query<ProviderQuery>,
) -> Result<Json<DeleteResponse>> {
    if !state.engine.remove(&key, query.provider.as_deref()).await? {
        return Err(CacheError::NotFound(key));
    }

    Ok(Json(DeleteResponse::new(key)))
}

/// Handler for POST /invalidate/tags
pub async fn invalidate_tags_handler(
    State(state): State<AppState>,
    Json(req): Json<InvalidateTagsRequest>,
) -> Result<Json<InvalidateResponse>> {
    let removed = state
        .engine
        .invalidate_by_tags_async(&req.tags, req.provider.as_deref())
        .await?;

    Ok(Json(InvalidateResponse { removed }))
}

/// Handler for POST /invalidate/pattern
///
/// Malformed patterns are rejected with 400 before anything is removed.
pub async fn invalidate_pattern_handler(
    State(state): State<AppState>,
    Json(req): Json<InvalidatePatternRequest>,
) -> Result<Json<InvalidateResponse>> {
    let removed = state
        .engine
        .invalidate_by_pattern_async(&req.pattern, req.provider.as_deref())
        .await?;

    Ok(Json(InvalidateResponse { removed }))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<CacheMetrics> {
    Json(state.engine.get_statistics())
}

/// Handler for POST /stats/reset
///
/// Zeroes the counters; the key inventory and memory figures are kept.
pub async fn reset_stats_handler(State(state): State<AppState>) -> Json<CacheMetrics> {
    state.engine.reset_statistics();
    Json(state.engine.get_statistics())
}

/// Handler for GET /providers
pub async fn providers_handler(State(state): State<AppState>) -> Json<ProvidersResponse> {
    Json(ProvidersResponse {
        providers: state.engine.provider_names(),
        default: DEFAULT_PROVIDER.to_string(),
    })
}

/// Handler for GET /health
///
/// Returns health status of the server.
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::healthy(state.engine.is_running()))
}
