//! HTTP server lifecycle.
//!
//! Usage: `cpg-explorer serve --addr 0.0.0.0:8080`

use std::sync::Arc;

use crate::api::{router, AppState};
use crate::config::ExplorerConfig;
use crate::error::Result;
use crate::graph::pool::StorePool;

/// Open the store pool, bind `config.server.addr` and serve until Ctrl-C.
pub async fn run_http_server(config: &ExplorerConfig) -> Result<()> {
    let pool = StorePool::open(&config.database)?;
    let app = router(Arc::new(AppState::new(pool)));

    let addr = config.server.addr.as_str();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, db = %config.database.path, "CPG explorer listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down HTTP server");
        })
        .await?;

    Ok(())
}
