//! Main HTTP gateway server: routing, shared state, and body limits.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use pagelens_core::{TextRecognizer, TokenVerifier, UserStore};

use crate::ocr_api;
use crate::profile_api;

/// Advisory client-side limit, re-validated here: 10 MB per upload.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Verifier and store, present only when auth enforcement is on.
#[derive(Clone)]
pub struct AuthContext {
    pub verifier: Arc<dyn TokenVerifier>,
    pub store: Arc<dyn UserStore>,
}

/// Application state shared across routes. All clients are constructed once
/// at startup and injected here; nothing is process-global.
pub struct AppState {
    pub recognizer: Arc<dyn TextRecognizer>,
    pub auth: Option<AuthContext>,
}

/// Build the gateway router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/ocr", post(ocr_api::annotate_image))
        .route("/api/login", post(profile_api::login))
        .route("/api/health", get(health))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "service": "pagelens" }))
}

/// Bind and serve until the process is stopped.
pub async fn start_server(addr: SocketAddr, state: Arc<AppState>) -> Result<()> {
    let app = build_router(state);
    info!("gateway listening on {}", addr);
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
