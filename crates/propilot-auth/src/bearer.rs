//! Bearer credential extraction from the Authorization header.

use crate::error::AuthError;

/// Pull the token out of an `Authorization` header value.
///
/// The scheme is matched case-insensitively; the token must be non-empty
/// and is returned without surrounding whitespace.
pub fn extract_bearer(header: Option<&str>) -> Result<&str, AuthError> {
    let value = header.ok_or(AuthError::MissingCredentials)?.trim();
    if value.is_empty() {
        return Err(AuthError::MissingCredentials);
    }

    // Scheme and token are separated by any run of ASCII whitespace.
    let split = value
        .find(|c: char| c.is_ascii_whitespace())
        .ok_or_else(|| AuthError::MalformedHeader("expected 'Bearer <token>'".to_string()))?;
    let (scheme, token) = value.split_at(split);

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::MalformedHeader(format!(
            "unsupported scheme '{}'",
            scheme
        )));
    }

    let token = token.trim();
    if token.is_empty() {
        return Err(AuthError::MalformedHeader("empty bearer token".to_string()));
    }
    Ok(token)
}
