//! Route handlers for the Admission Service's HTTP surface (§6). Each
//! handler authenticates (where the table requires it), deserializes its
//! body, calls the matching `SyncServer` admission operation, and lets
//! `ApiError`'s `IntoResponse` impl do the status/code mapping.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::AppError;
use crate::protocol::{Codec, RoomId, UserId};
use crate::server::{CreateRoomInput, SyncServer};

use super::error_response::{ApiError, ApiResult};

async fn authenticate(headers: &HeaderMap, server: &SyncServer) -> Result<UserId, ApiError> {
    let token = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::AuthFailed("missing bearer token".into()))?;

    let user_id = server
        .token_verifier()
        .verify(token)
        .await
        .map(|identity| identity.user_id)
        .map_err(|err| ApiError(AppError::AuthFailed(err.to_string())))?;

    server.check_admission_rate_limit(user_id)?;
    Ok(user_id)
}

#[derive(Debug, Deserialize)]
struct CreateRoomRequest {
    file_hash: String,
    duration_ms: u64,
    file_size: u64,
    codec: Codec,
    #[serde(default)]
    expires_in_days: Option<u32>,
    #[serde(default)]
    passcode: Option<String>,
}

#[derive(Debug, Serialize)]
struct MessageResponse {
    message: String,
}

async fn create_room(
    State(server): State<Arc<SyncServer>>,
    headers: HeaderMap,
    Json(body): Json<CreateRoomRequest>,
) -> ApiResult<(StatusCode, Json<crate::server::CreateRoomResult>)> {
    let host_id = authenticate(&headers, &server).await?;
    let result = server
        .create_room(CreateRoomInput {
            host_id,
            file_hash: body.file_hash,
            duration_ms: body.duration_ms,
            file_size: body.file_size,
            codec: body.codec,
            expires_in_days: body.expires_in_days.unwrap_or(server.config().room_expiry_days_default),
            passcode: body.passcode,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(result)))
}

#[derive(Debug, Default, Deserialize)]
struct ValidateRoomRequest {
    #[serde(default)]
    file_hash: Option<String>,
    #[serde(default)]
    passcode: Option<String>,
}

async fn validate_room(
    State(server): State<Arc<SyncServer>>,
    headers: HeaderMap,
    Path(room_id): Path<RoomId>,
    Json(body): Json<ValidateRoomRequest>,
) -> ApiResult<Json<crate::server::ValidateRoomResult>> {
    authenticate(&headers, &server).await?;
    let result = server
        .validate_room(&room_id, body.file_hash.as_deref(), body.passcode.as_deref())
        .await?;
    Ok(Json(result))
}

async fn room_details(
    State(server): State<Arc<SyncServer>>,
    headers: HeaderMap,
    Path(room_id): Path<RoomId>,
) -> ApiResult<Json<crate::server::RoomDetails>> {
    authenticate(&headers, &server).await?;
    Ok(Json(server.room_details(&room_id).await?))
}

async fn probe_room(
    State(server): State<Arc<SyncServer>>,
    Path(room_id): Path<RoomId>,
) -> ApiResult<Json<serde_json::Value>> {
    let is_active = server.probe_room(&room_id).await?;
    Ok(Json(serde_json::json!({ "is_active": is_active })))
}

async fn close_room(
    State(server): State<Arc<SyncServer>>,
    headers: HeaderMap,
    Path(room_id): Path<RoomId>,
) -> ApiResult<Json<MessageResponse>> {
    let caller_id = authenticate(&headers, &server).await?;
    server.close_room(&room_id, caller_id).await?;
    Ok(Json(MessageResponse {
        message: "room closed".to_string(),
    }))
}

async fn leave_temporary(
    State(server): State<Arc<SyncServer>>,
    headers: HeaderMap,
    Path(room_id): Path<RoomId>,
) -> ApiResult<Json<crate::server::LeaveTemporaryResult>> {
    let caller_id = authenticate(&headers, &server).await?;
    Ok(Json(server.leave_temporary(&room_id, caller_id).await))
}

async fn rejoin(
    State(server): State<Arc<SyncServer>>,
    headers: HeaderMap,
    Path(room_id): Path<RoomId>,
) -> ApiResult<Json<crate::server::RejoinSnapshot>> {
    let caller_id = authenticate(&headers, &server).await?;
    let snapshot = server.rejoin(&room_id, caller_id).await?;
    Ok(Json(snapshot))
}

pub fn admission_routes() -> Router<Arc<SyncServer>> {
    Router::new()
        .route("/api/rooms/create", post(create_room))
        .route("/api/rooms/{id}/validate", post(validate_room))
        .route("/api/rooms/{id}", get(room_details))
        .route("/api/rooms/{id}/probe", get(probe_room))
        .route("/api/rooms/{id}/close", post(close_room))
        .route("/api/rooms/{id}/leave-temporary", post(leave_temporary))
        .route("/api/rooms/{id}/rejoin", post(rejoin))
}
