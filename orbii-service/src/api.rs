//! HTTP API for the Orbii service.
//!
//! This module provides the endpoints for:
//! - Health monitoring
//! - Chat turns and study text
//! - Learning roadmaps
//!
//! Everything else falls through to the static UI assets.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{any, get, post},
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::i18n::keys;
use crate::service::OrbiiService;

pub mod chat;
pub mod roadmap;
pub mod study_text;
use chat::chat_handler;
use roadmap::roadmap_handler;
use study_text::study_text_handler;

/// Application state
pub struct AppState {
    pub service: Arc<OrbiiService>,
    pub start_time: Instant,
}

/// Build the API router
pub fn router(service: Arc<OrbiiService>) -> Router {
    let assets = ServeDir::new(&service.config.assets.dir);

    let state = Arc::new(AppState {
        service,
        start_time: Instant::now(),
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/chat", post(chat_handler))
        .route("/study-text", post(study_text_handler))
        .route("/roadmap", post(roadmap_handler));

    Router::new()
        .route("/health", get(health_handler))
        .route("/favicon.ico", any(favicon_handler))
        .nest("/api", api_routes)
        .fallback_service(assets)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Trimmed, non-empty string value of a loosely typed request field
pub(crate) fn text_field(value: &Option<Value>) -> Option<&str> {
    value
        .as_ref()
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|text| !text.is_empty())
}

// === Health ===

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let inference_available = state.service.inference.health_check().await;

    let status = if inference_available {
        state.service.i18n.text(keys::HEALTH_HEALTHY)
    } else {
        state
            .service
            .i18n
            .text_with(keys::HEALTH_DEGRADED, &[("reason", "inference backend unavailable")])
    };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        inference_available,
    })
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: String,
    version: String,
    uptime_seconds: u64,
    inference_available: bool,
}

async fn favicon_handler() -> StatusCode {
    StatusCode::NO_CONTENT
}
