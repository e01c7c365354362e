//! HTTP API for the analyzer service.
//!
//! Exposes document upload, status polling, a per-document progress
//! WebSocket, and a health endpoint.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Path, State, WebSocketUpgrade},
    response::IntoResponse,
    routing::{get, post},
};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::service::AnalyzerService;
use crate::websocket::handle_progress_socket;

pub mod documents;
use documents::{get_document_status_handler, upload_document_handler};

/// Application state shared by all handlers.
pub struct AppState {
    pub service: Arc<AnalyzerService>,
    pub start_time: Instant,
}

/// Room for multipart boundaries and part headers on top of the document
/// size ceiling. The ceiling itself is enforced by upload validation, so the
/// body limit must not cut off a request whose file is exactly at it.
const MULTIPART_FRAMING_ALLOWANCE: usize = 64 * 1024;

/// Build the API router.
pub fn router(service: Arc<AnalyzerService>) -> Router {
    let max_body_size =
        service.config.limits.max_document_size_bytes as usize + MULTIPART_FRAMING_ALLOWANCE;

    let state = Arc::new(AppState {
        service,
        start_time: Instant::now(),
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route(
            "/documents",
            post(upload_document_handler).layer(DefaultBodyLimit::max(max_body_size)),
        )
        .route("/documents/{id}", get(get_document_status_handler));

    Router::new()
        .route("/health", get(health_handler))
        .route("/ws/documents/{id}", get(ws_handler))
        .nest("/api", api_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// === Health ===

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: String,
    uptime_seconds: u64,
}

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
    })
}

// === WebSocket ===

async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    info!(document_id = %id, "WebSocket upgrade request received");
    let channels = state.service.channels.clone();
    ws.on_upgrade(move |socket| handle_progress_socket(socket, id, channels))
}
