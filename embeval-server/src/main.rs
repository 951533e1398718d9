//! embeval server entry point.
//!
//! Loads a JSON configuration (models, rerankers, corpus, phrases), then
//! serves the evaluation SSE endpoints:
//!
//! - `GET /api/grid-search` — sweep chunking configurations
//! - `GET /api/evaluate` — evaluate a single configuration
//! - `GET /api/runs` — run history for a model
//!
//! The configuration path comes from `EMBEVAL_CONFIG` (default
//! `embeval.json`).

mod sse;
mod state;

use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use axum::routing::get;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::state::{AppState, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config_path =
        std::env::var("EMBEVAL_CONFIG").unwrap_or_else(|_| "embeval.json".to_string());
    let raw = std::fs::read_to_string(&config_path)
        .with_context(|| format!("failed to read config '{config_path}'"))?;
    let config: ServerConfig =
        serde_json::from_str(&raw).with_context(|| format!("invalid config '{config_path}'"))?;

    let listen_addr = config.listen_addr.clone();
    let state = Arc::new(AppState::from_config(config));
    info!(
        models = state.models.len(),
        rerankers = state.rerankers.len(),
        phrases = state.phrases.len(),
        "configuration loaded"
    );

    let app = Router::new()
        .route("/api/grid-search", get(sse::grid_search))
        .route("/api/evaluate", get(sse::evaluate))
        .route("/api/runs", get(sse::list_runs))
        .layer(CorsLayer::permissive())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&listen_addr)
        .await
        .with_context(|| format!("failed to bind {listen_addr}"))?;
    info!(%listen_addr, "embeval server listening");
    axum::serve(listener, app).await?;

    Ok(())
}
