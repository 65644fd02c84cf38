//! Wire-level error taxonomy shared by the admission REST surface and the
//! signaling hub. Mirrors the split used in
//! `protocol::error_codes`: a `Display`-able, `SCREAMING_SNAKE_CASE`-coded
//! enum carried on the wire, plus a typed Rust error at module boundaries.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    AuthFailed,
    Unauthorized,
    InvalidPayload,
    RoomNotFound,
    RoomExpired,
    RoomIdExhausted,
    PasscodeRequired,
    InvalidPasscode,
    FileMismatch,
    StorageUnavailable,
    TransportError,
    RateLimited,
}

impl ErrorCode {
    pub fn description(&self) -> &'static str {
        match self {
            ErrorCode::AuthFailed => "The bearer token is missing or could not be verified.",
            ErrorCode::Unauthorized => {
                "The caller is authenticated but not permitted to perform this action."
            }
            ErrorCode::InvalidPayload => "The request or event payload failed validation.",
            ErrorCode::RoomNotFound => "No room exists with the given id.",
            ErrorCode::RoomExpired => "The room is no longer active or has passed its expiry.",
            ErrorCode::RoomIdExhausted => {
                "A unique room id could not be generated after repeated collisions."
            }
            ErrorCode::PasscodeRequired => "This room requires a passcode to join.",
            ErrorCode::InvalidPasscode => "The supplied passcode does not match the room's.",
            ErrorCode::FileMismatch => {
                "The follower's file hash does not match the host's file hash."
            }
            ErrorCode::StorageUnavailable => {
                "The durable metadata store is unavailable and the operation has no memory-only fallback."
            }
            ErrorCode::TransportError => "The connection experienced an unrecoverable transport fault.",
            ErrorCode::RateLimited => "Too many requests from this caller; retry after the window resets.",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Application-level error for the Admission Service and Room Registry.
///
/// Every REST handler and signaling dispatch path converts failures into one
/// of these variants, which in turn map to an HTTP status or an `error`
/// event carrying an [`ErrorCode`].
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    AuthFailed(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
    #[error("room not found")]
    RoomNotFound,
    #[error("room expired")]
    RoomExpired,
    #[error("room id space exhausted")]
    RoomIdExhausted,
    #[error("passcode required")]
    PasscodeRequired,
    #[error("invalid passcode")]
    InvalidPasscode,
    #[error("file hash mismatch: expected {expected}, received {received}")]
    FileMismatch { expected: String, received: String },
    #[error("storage unavailable")]
    StorageUnavailable,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("rate limit exceeded")]
    RateLimited,
}

impl AppError {
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::AuthFailed(_) => ErrorCode::AuthFailed,
            AppError::Unauthorized(_) => ErrorCode::Unauthorized,
            AppError::InvalidPayload(_) => ErrorCode::InvalidPayload,
            AppError::RoomNotFound => ErrorCode::RoomNotFound,
            AppError::RoomExpired => ErrorCode::RoomExpired,
            AppError::RoomIdExhausted => ErrorCode::RoomIdExhausted,
            AppError::PasscodeRequired => ErrorCode::PasscodeRequired,
            AppError::InvalidPasscode => ErrorCode::InvalidPasscode,
            AppError::FileMismatch { .. } => ErrorCode::FileMismatch,
            AppError::StorageUnavailable => ErrorCode::StorageUnavailable,
            AppError::Transport(_) => ErrorCode::TransportError,
            AppError::RateLimited => ErrorCode::RateLimited,
        }
    }

    pub fn http_status(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            AppError::AuthFailed(_) => StatusCode::UNAUTHORIZED,
            AppError::Unauthorized(_) => StatusCode::FORBIDDEN,
            AppError::InvalidPayload(_) => StatusCode::BAD_REQUEST,
            AppError::RoomNotFound => StatusCode::NOT_FOUND,
            AppError::RoomExpired => StatusCode::GONE,
            AppError::RoomIdExhausted => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::PasscodeRequired | AppError::InvalidPasscode => StatusCode::UNAUTHORIZED,
            AppError::FileMismatch { .. } => StatusCode::BAD_REQUEST,
            AppError::StorageUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Transport(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_serialize_screaming_snake_case() {
        let json = serde_json::to_string(&ErrorCode::FileMismatch).unwrap();
        assert_eq!(json, "\"FILE_MISMATCH\"");
    }

    #[test]
    fn all_error_codes_have_nonempty_descriptions() {
        for code in [
            ErrorCode::AuthFailed,
            ErrorCode::Unauthorized,
            ErrorCode::InvalidPayload,
            ErrorCode::RoomNotFound,
            ErrorCode::RoomExpired,
            ErrorCode::RoomIdExhausted,
            ErrorCode::PasscodeRequired,
            ErrorCode::InvalidPasscode,
            ErrorCode::FileMismatch,
            ErrorCode::StorageUnavailable,
            ErrorCode::TransportError,
            ErrorCode::RateLimited,
        ] {
            assert!(code.description().len() > 10);
        }
    }

    #[test]
    fn app_error_maps_to_expected_status() {
        assert_eq!(
            AppError::RoomNotFound.http_status(),
            axum::http::StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::RoomExpired.http_status(),
            axum::http::StatusCode::GONE
        );
    }
}
