//! HTTP API: axum router, handlers and error mapping.
//!
//! All routes are `GET` and read-only. Store work runs on the blocking
//! thread pool against a connection checked out of [`StorePool`].

pub mod error;
pub mod handlers;
pub mod http;

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::graph::pool::StorePool;

/// Shared state handed to every handler.
#[derive(Debug)]
pub struct AppState {
    pub pool: StorePool,
}

impl AppState {
    pub fn new(pool: StorePool) -> Self {
        Self { pool }
    }
}

/// Build the API router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/callgraph", get(handlers::callgraph))
        .route("/api/dataflow", get(handlers::dataflow))
        .route("/api/overview", get(handlers::overview))
        .route("/api/distributions", get(handlers::distributions))
        .route("/api/packages", get(handlers::list_packages))
        .route("/api/packages/graph", get(handlers::package_graph))
        .route("/api/packages/{name}/functions", get(handlers::package_functions))
        .route("/api/functions", get(handlers::search_functions))
        .route("/api/functions/detail", get(handlers::function_detail))
        .route("/api/source", get(handlers::source))
        .route("/api/source/outline", get(handlers::file_outline))
        .route("/api/hotspots", get(handlers::hotspots))
        .route("/api/search", get(handlers::global_search))
        .route("/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
