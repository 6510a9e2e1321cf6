//! Authentication error types.

use thiserror::Error;

/// Reasons a request fails the auth gate.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No Authorization header
    #[error("Not authenticated")]
    MissingCredentials,

    /// Authorization header present but not `Bearer <token>`
    #[error("Invalid authentication credentials: {0}")]
    MalformedHeader(String),

    /// Signature, audience, issuer, expiry or key lookup failed
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    /// Signing keys could not be fetched from the identity provider
    #[error("Signing keys unavailable: {0}")]
    KeySetUnavailable(String),

    /// Verifier lacks the domain or audience it needs
    #[error("Token verification is not configured")]
    NotConfigured,
}

impl AuthError {
    /// Whether the caller is at fault (401) rather than the gateway (503).
    pub fn is_client_error(&self) -> bool {
        !matches!(self, AuthError::KeySetUnavailable(_))
    }
}
