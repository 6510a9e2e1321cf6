//! # propilot-auth
//!
//! Bearer-token gate for the ProPilot service.
//!
//! A [`TokenVerifier`] turns a bearer token into [`Claims`]. Two variants:
//! - [`Auth0Verifier`]: RS256 against the tenant's JWKS, audience and issuer checked
//! - [`BypassVerifier`]: fixed claims, selected only with `auth.mode = "bypass"`

pub mod auth0;
pub mod bearer;
pub mod bypass;
pub mod claims;
pub mod error;
pub mod verifier;

pub use auth0::Auth0Verifier;
pub use bearer::extract_bearer;
pub use bypass::{BypassVerifier, BYPASS_SUBJECT};
pub use claims::Claims;
pub use error::AuthError;
pub use verifier::{build_verifier, TokenVerifier};
