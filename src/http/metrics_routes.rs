use axum::extract::State;
use axum::http::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use std::sync::Arc;

use crate::auth::secrets_match;
use crate::server::SyncServer;

fn enforce_metrics_auth(headers: &HeaderMap, server: &SyncServer) -> Result<(), StatusCode> {
    let Some(expected) = server.config().metrics_auth_token.as_deref() else {
        return Ok(());
    };

    let Some(token) = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
    else {
        tracing::warn!("rejected metrics access: missing bearer token");
        return Err(StatusCode::UNAUTHORIZED);
    };

    if secrets_match(token, expected) {
        Ok(())
    } else {
        tracing::warn!("rejected metrics access: token mismatch");
        Err(StatusCode::UNAUTHORIZED)
    }
}

pub async fn metrics_handler(
    headers: HeaderMap,
    State(server): State<Arc<SyncServer>>,
) -> Result<Json<crate::metrics::MetricsSnapshot>, StatusCode> {
    enforce_metrics_auth(&headers, &server)?;
    Ok(Json(server.metrics().snapshot()))
}

pub async fn prometheus_metrics_handler(
    headers: HeaderMap,
    State(server): State<Arc<SyncServer>>,
) -> Result<Response, StatusCode> {
    enforce_metrics_auth(&headers, &server)?;
    let body = server.metrics().to_prometheus_text();
    let headers = [(CONTENT_TYPE, HeaderValue::from_static("text/plain; version=0.0.4; charset=utf-8"))];
    Ok((headers, body).into_response())
}
