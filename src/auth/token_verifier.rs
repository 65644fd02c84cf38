//! Token Verifier (§4.5): a pluggable, stateless external collaborator.
//! The core caches nothing across verifications, exactly as specified.
//!
//! Shape follows an `auth::middleware::AuthMiddleware`-style design: a
//! small trait with one async operation, a constant-time secret comparison
//! helper reused wherever a secret is compared (here: room passcodes), and
//! a static/in-memory implementation suited to local development and
//! integration tests alongside a stub for the real external provider.

use super::error::AuthError;
use crate::protocol::UserId;
use async_trait::async_trait;
use std::collections::HashMap;
use subtle::ConstantTimeEq;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    pub user_id: UserId,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<VerifiedIdentity, AuthError>;
}

/// Constant-time comparison for secrets (passcodes, static tokens),
/// length is not the secret, so a
/// length mismatch short-circuits before the constant-time compare.
pub fn secrets_match(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// A static, in-memory verifier backed by a token → identity table loaded
/// at startup. Useful for local development and deterministic tests; the
/// this plays the same "static configuration loaded
/// at startup" role for app credentials.
pub struct StaticTokenVerifier {
    tokens: HashMap<String, VerifiedIdentity>,
}

impl StaticTokenVerifier {
    pub fn new(entries: Vec<(String, VerifiedIdentity)>) -> Self {
        Self {
            tokens: entries.into_iter().collect(),
        }
    }
}

#[async_trait]
impl TokenVerifier for StaticTokenVerifier {
    async fn verify(&self, token: &str) -> Result<VerifiedIdentity, AuthError> {
        if token.is_empty() {
            return Err(AuthError::MissingToken);
        }
        self.tokens
            .iter()
            .find(|(known, _)| secrets_match(known, token))
            .map(|(_, identity)| identity.clone())
            .ok_or(AuthError::InvalidToken)
    }
}

/// Stub for forwarding verification to the real external identity
/// provider. Out of scope per §1 ("authentication token issuance... the
/// core only verifies"); constructed here to document the seam, exercised
/// only by tests that supply a fake base URL.
pub struct BearerForwardingVerifier {
    #[allow(dead_code)]
    provider_base_url: String,
}

impl BearerForwardingVerifier {
    pub fn new(provider_base_url: impl Into<String>) -> Self {
        Self {
            provider_base_url: provider_base_url.into(),
        }
    }
}

#[async_trait]
impl TokenVerifier for BearerForwardingVerifier {
    async fn verify(&self, _token: &str) -> Result<VerifiedIdentity, AuthError> {
        // The real identity provider lives outside this repository; wiring
        // an HTTP client here is future work once its contract is fixed.
        Err(AuthError::VerifierUnavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_identity() -> VerifiedIdentity {
        VerifiedIdentity {
            user_id: uuid::Uuid::new_v4(),
            email: Some("user@example.com".to_string()),
            phone: None,
        }
    }

    #[tokio::test]
    async fn valid_token_resolves_identity() {
        let identity = sample_identity();
        let verifier =
            StaticTokenVerifier::new(vec![("good-token".to_string(), identity.clone())]);
        let resolved = verifier.verify("good-token").await.unwrap();
        assert_eq!(resolved.user_id, identity.user_id);
    }

    #[tokio::test]
    async fn unknown_token_fails_auth() {
        let verifier = StaticTokenVerifier::new(vec![]);
        assert_eq!(
            verifier.verify("unknown").await.unwrap_err(),
            AuthError::InvalidToken
        );
    }

    #[tokio::test]
    async fn empty_token_is_missing_not_invalid() {
        let verifier = StaticTokenVerifier::new(vec![]);
        assert_eq!(
            verifier.verify("").await.unwrap_err(),
            AuthError::MissingToken
        );
    }

    #[test]
    fn secrets_match_rejects_different_lengths_without_panicking() {
        assert!(!secrets_match("short", "a-much-longer-secret"));
    }

    #[test]
    fn secrets_match_accepts_identical_secrets() {
        assert!(secrets_match("same-secret", "same-secret"));
    }
}
