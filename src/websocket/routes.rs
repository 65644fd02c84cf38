//! Router assembly for the `/ws` upgrade plus health and metrics endpoints.

use axum::extract::State;
use axum::response::Json;
use axum::routing::get;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::{metrics_handler, prometheus_metrics_handler};
use crate::server::SyncServer;

use super::handler::websocket_handler;

pub fn cors_layer(cors_origins: &str) -> CorsLayer {
    if cors_origins == "*" {
        return CorsLayer::permissive();
    }
    let origins: Vec<_> = cors_origins
        .split(',')
        .filter_map(|s| s.trim().parse::<axum::http::HeaderValue>().ok())
        .collect();
    if origins.is_empty() {
        tracing::warn!("no valid CORS origins configured, falling back to permissive CORS");
        return CorsLayer::permissive();
    }
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}

pub fn create_router(cors_origins: &str) -> axum::Router<Arc<SyncServer>> {
    axum::Router::new()
        .route("/ws", get(websocket_handler))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        .route("/metrics/prom", get(prometheus_metrics_handler))
        .merge(crate::http::admission_routes())
        .layer(cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
}

async fn health_check(State(server): State<Arc<SyncServer>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "timestamp": chrono::Utc::now(),
        "uptime": server.uptime().as_secs(),
    }))
}
