//! Token verification capability.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use propilot_types::{AuthMode, AuthSettings};

use crate::auth0::Auth0Verifier;
use crate::bypass::BypassVerifier;
use crate::claims::Claims;
use crate::error::AuthError;

/// Maps a bearer token to the caller's claims.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    /// Verify `token` and return its claims.
    async fn verify(&self, token: &str) -> Result<Claims, AuthError>;

    /// Short name for logs ("auth0", "bypass").
    fn name(&self) -> &'static str;
}

/// Build the verifier selected by `settings.mode`.
///
/// Bypass is only ever returned when explicitly configured.
pub fn build_verifier(settings: &AuthSettings) -> Result<Arc<dyn TokenVerifier>, AuthError> {
    match settings.mode {
        AuthMode::Auth0 => Ok(Arc::new(Auth0Verifier::from_settings(settings)?)),
        AuthMode::Bypass => {
            warn!("Token verification is DISABLED (auth.mode = bypass); every bearer token is accepted");
            Ok(Arc::new(BypassVerifier::default()))
        }
    }
}
