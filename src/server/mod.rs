//! HTTP surface: analysis streaming plus the scan history endpoints.

pub mod analyze;
pub mod auth;
pub mod scans;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::DefaultBodyLimit,
    http::HeaderName,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::llm::gemini::GeminiClient;
use crate::llm::{Gateway, ModelClient};
use crate::storage::ScanStore;

pub struct AppState {
    pub config: AppConfig,
    pub gateway: Gateway,
    pub store: ScanStore,
    pub user_header: HeaderName,
}

impl AppState {
    pub fn new(config: AppConfig, gateway: Gateway, store: ScanStore) -> Result<Arc<Self>> {
        let user_header = HeaderName::from_bytes(config.auth.user_header.as_bytes())
            .with_context(|| format!("Invalid auth.user_header: {}", config.auth.user_header))?;
        Ok(Arc::new(Self {
            config,
            gateway,
            store,
            user_header,
        }))
    }
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub fn router(state: Arc<AppState>) -> Router {
    let upload_limit = state.config.server.max_upload_bytes;

    Router::new()
        .route("/health", get(health_check))
        .route("/analyze", post(analyze::analyze))
        .route("/scans", get(scans::list_scans))
        .route(
            "/scan/:id",
            get(scans::get_scan).delete(scans::delete_scan),
        )
        .layer(DefaultBodyLimit::max(upload_limit))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the server until Ctrl-C.
pub async fn serve(config: AppConfig) -> Result<()> {
    let db_path = config.storage.db_path();
    let store = ScanStore::open(&db_path)?;
    info!(db = %db_path.display(), "scan database ready");

    let client = GeminiClient::from_env(&config.model);
    if let Err(e) = client.ensure_credentials() {
        warn!(error = %e, "analysis requests will fail until the key is set");
    }
    let gateway = Gateway::new(Arc::new(client), config.model.candidates.clone());
    info!(candidates = ?gateway.candidates(), "model gateway ready");

    let bind = config.server.bind.clone();
    let state = AppState::new(config, gateway, store)?;

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("Failed to bind {bind}"))?;
    info!(addr = %bind, "listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutting down");
    }
}
