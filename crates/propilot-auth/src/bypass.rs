//! Verifier that accepts any token.

use async_trait::async_trait;

use crate::claims::Claims;
use crate::error::AuthError;
use crate::verifier::TokenVerifier;

/// Subject returned for every request
pub const BYPASS_SUBJECT: &str = "user123";

/// Returns fixed claims without looking at the token.
///
/// For local development and tests only.
#[derive(Debug, Clone)]
pub struct BypassVerifier {
    claims: Claims,
}

impl BypassVerifier {
    pub fn new(claims: Claims) -> Self {
        Self { claims }
    }
}

impl Default for BypassVerifier {
    fn default() -> Self {
        Self::new(Claims::with_subject(BYPASS_SUBJECT))
    }
}

#[async_trait]
impl TokenVerifier for BypassVerifier {
    async fn verify(&self, _token: &str) -> Result<Claims, AuthError> {
        Ok(self.claims.clone())
    }

    fn name(&self) -> &'static str {
        "bypass"
    }
}
