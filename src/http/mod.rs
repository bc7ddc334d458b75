//! Prediction HTTP service.
//!
//! Exposes `POST /predict`, `GET /emotions` and `GET /health` over an Axum
//! router whose state wraps the shared inference service.

mod routes;

use std::net::SocketAddr;

use anyhow::Context;

use crate::config::AppConfig;
use crate::inference::InferenceService;

pub use routes::{
    build_router, run_http_server, AppState, HealthResponse, HttpServerError, AUDIO_FIELD,
};

/// Environment variable overriding `server.bind_addr`
pub const BIND_ADDR_ENV: &str = "EMOTION_HTTP_ADDR";

/// Resolve the listen address: environment, then config
pub fn resolve_bind_addr(config: &AppConfig) -> anyhow::Result<SocketAddr> {
    let raw = std::env::var(BIND_ADDR_ENV).unwrap_or_else(|_| config.server.bind_addr.clone());
    raw.parse()
        .with_context(|| format!("parsing HTTP bind address {:?}", raw))
}

/// Load the model and log, then serve until Ctrl-C
pub async fn serve(config: &AppConfig, addr: SocketAddr) -> anyhow::Result<()> {
    let bootstrap_config = config.clone();
    let service = tokio::task::spawn_blocking(move || InferenceService::bootstrap(&bootstrap_config))
        .await
        .context("joining service bootstrap task")??;

    let state = AppState::new(service, &config.server);
    run_http_server(state, addr).await
}
