//! Converts [`AppError`] into the JSON error body every admission handler
//! returns on failure: `{error, details?}` at the status
//! `AppError::http_status` names.

use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::error::AppError;

#[derive(Serialize)]
struct ErrorBody {
    error: crate::error::ErrorCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

pub(super) struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.0.http_status();
        let body = ErrorBody {
            error: self.0.code(),
            details: Some(self.0.to_string()),
        };
        (status, Json(body)).into_response()
    }
}

pub(super) type ApiResult<T> = Result<T, ApiError>;
