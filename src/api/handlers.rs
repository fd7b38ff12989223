//! HTTP handlers.
//!
//! Every handler parses its query string into raw optional strings, checks
//! out a pooled store on a blocking worker, and hands the store call's
//! result back as JSON. Malformed numbers fall back to defaults instead of
//! rejecting the request.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use crate::api::error::{ApiError, ResultExt};
use crate::api::AppState;
use crate::error::{CpgError, Result};
use crate::graph::catalog::{
    Distributions, FunctionDetail, FunctionSummary, Hotspot, OutlineEntry, PackageGraph,
    PackageSummary, SearchHit, SourceFile,
};
use crate::graph::profile::{query_int, TraversalProfile, CALL_GRAPH, DATA_FLOW};
use crate::graph::store::GraphStore;
use crate::graph::traversal::TraversalGraph;

/// Upper bound on any list `limit`.
pub const MAX_LIST_LIMIT: i64 = 1000;

// ---------------------------------------------------------------------------
// Query parameters
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub struct TraversalParams {
    pub id: Option<String>,
    pub depth: Option<String>,
    pub direction: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub limit: Option<String>,
    pub offset: Option<String>,
    pub sort: Option<String>,
    pub search: Option<String>,
    pub package: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct IdParams {
    pub id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct FileParams {
    pub file: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    pub limit: Option<String>,
}

fn list_limit(raw: Option<&str>, default: i64) -> u32 {
    // Clamped into 1..=MAX_LIST_LIMIT, so the cast is lossless.
    query_int(raw, default).clamp(1, MAX_LIST_LIMIT) as u32
}

fn list_offset(raw: Option<&str>) -> u32 {
    query_int(raw, 0).clamp(0, i64::from(u32::MAX)) as u32
}

fn required<'a>(value: Option<&'a str>, message: &str) -> Result<&'a str> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| CpgError::InvalidInput(message.to_string()))
}

/// Run `f` against a pooled store on the blocking thread pool.
async fn with_store<T, F>(
    state: &Arc<AppState>,
    context: &'static str,
    f: F,
) -> std::result::Result<T, ApiError>
where
    F: FnOnce(&GraphStore) -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = Arc::clone(state);
    tokio::task::spawn_blocking(move || {
        let store = state.pool.acquire();
        f(&store)
    })
    .await
    .map_err(|e| ApiError::join(context, e))?
    .context(context)
}

// ---------------------------------------------------------------------------
// Traversal
// ---------------------------------------------------------------------------

async fn run_traversal(
    state: Arc<AppState>,
    profile: &'static TraversalProfile,
    params: TraversalParams,
) -> std::result::Result<Json<TraversalGraph>, ApiError> {
    let request = profile
        .resolve(
            params.id.as_deref(),
            params.depth.as_deref(),
            params.direction.as_deref(),
        )
        .context(profile.name)?;
    let graph = with_store(&state, profile.name, move |store| profile.run(store, &request)).await?;
    Ok(Json(graph))
}

/// `GET /api/callgraph?id&depth&direction`
pub async fn callgraph(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TraversalParams>,
) -> std::result::Result<Json<TraversalGraph>, ApiError> {
    run_traversal(state, &CALL_GRAPH, params).await
}

/// `GET /api/dataflow?id&depth&direction`
pub async fn dataflow(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TraversalParams>,
) -> std::result::Result<Json<TraversalGraph>, ApiError> {
    run_traversal(state, &DATA_FLOW, params).await
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

pub async fn overview(
    State(state): State<Arc<AppState>>,
) -> std::result::Result<Json<BTreeMap<String, String>>, ApiError> {
    with_store(&state, "overview", |store| store.overview())
        .await
        .map(Json)
}

pub async fn distributions(
    State(state): State<Arc<AppState>>,
) -> std::result::Result<Json<Distributions>, ApiError> {
    with_store(&state, "distributions", |store| store.distributions())
        .await
        .map(Json)
}

pub async fn list_packages(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> std::result::Result<Json<Vec<PackageSummary>>, ApiError> {
    let limit = list_limit(params.limit.as_deref(), 200);
    let offset = list_offset(params.offset.as_deref());
    with_store(&state, "packages", move |store| {
        store.list_packages(params.sort.as_deref(), limit, offset)
    })
    .await
    .map(Json)
}

pub async fn package_graph(
    State(state): State<Arc<AppState>>,
) -> std::result::Result<Json<PackageGraph>, ApiError> {
    with_store(&state, "package graph", |store| store.package_graph())
        .await
        .map(Json)
}

pub async fn package_functions(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Query(params): Query<ListParams>,
) -> std::result::Result<Json<Vec<FunctionSummary>>, ApiError> {
    let limit = list_limit(params.limit.as_deref(), 100);
    with_store(&state, "package functions", move |store| {
        store.package_functions(&name, limit)
    })
    .await
    .map(Json)
}

pub async fn search_functions(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> std::result::Result<Json<Vec<FunctionSummary>>, ApiError> {
    let limit = list_limit(params.limit.as_deref(), 50);
    let offset = list_offset(params.offset.as_deref());
    with_store(&state, "functions", move |store| {
        store.search_functions(
            params.search.as_deref().unwrap_or_default(),
            params.package.as_deref().unwrap_or_default(),
            limit,
            offset,
        )
    })
    .await
    .map(Json)
}

pub async fn function_detail(
    State(state): State<Arc<AppState>>,
    Query(params): Query<IdParams>,
) -> std::result::Result<Json<FunctionDetail>, ApiError> {
    let id = required(params.id.as_deref(), "function id is required")
        .context("function detail")?
        .to_string();
    with_store(&state, "function detail", move |store| store.function_detail(&id))
        .await
        .map(Json)
}

pub async fn source(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FileParams>,
) -> std::result::Result<Json<SourceFile>, ApiError> {
    let file = required(params.file.as_deref(), "file path is required")
        .context("source")?
        .to_string();
    with_store(&state, "source", move |store| store.source(&file))
        .await
        .map(Json)
}

pub async fn file_outline(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FileParams>,
) -> std::result::Result<Json<Vec<OutlineEntry>>, ApiError> {
    let file = required(params.file.as_deref(), "file path is required")
        .context("outline")?
        .to_string();
    with_store(&state, "outline", move |store| store.file_outline(&file))
        .await
        .map(Json)
}

pub async fn hotspots(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> std::result::Result<Json<Vec<Hotspot>>, ApiError> {
    let limit = list_limit(params.limit.as_deref(), 30);
    with_store(&state, "hotspots", move |store| store.hotspots(limit))
        .await
        .map(Json)
}

pub async fn global_search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> std::result::Result<Json<Vec<SearchHit>>, ApiError> {
    let q = params.q.unwrap_or_default();
    if q.is_empty() {
        return Ok(Json(Vec::new()));
    }
    let limit = list_limit(params.limit.as_deref(), 30);
    with_store(&state, "search", move |store| store.global_search(&q, limit))
        .await
        .map(Json)
}

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
