//! Auth gate as an axum extractor.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use tracing::debug;

use propilot_auth::{extract_bearer, AuthError, Claims};

use crate::error::ApiError;
use crate::state::AppState;

/// Verified caller identity. Handlers taking this never run for
/// unauthenticated requests.
#[derive(Debug, Clone)]
pub struct Identity(pub Claims);

impl FromRequestParts<AppState> for Identity {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .map(|value| {
                value
                    .to_str()
                    .map_err(|_| AuthError::MalformedHeader("header is not visible ASCII".to_string()))
            })
            .transpose()?;

        let token = extract_bearer(header)?;
        let claims = state.verifier.verify(token).await.map_err(|e| {
            debug!(verifier = state.verifier.name(), error = %e, "Rejected bearer token");
            e
        })?;

        Ok(Identity(claims))
    }
}
