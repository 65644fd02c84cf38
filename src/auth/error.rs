//! Typed auth failures, in the shape of `auth::error::AuthError`.

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("missing or malformed bearer token")]
    MissingToken,
    #[error("token verification failed")]
    InvalidToken,
    #[error("token verifier is unavailable")]
    VerifierUnavailable,
}
