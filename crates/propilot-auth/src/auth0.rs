//! RS256 verification against an Auth0 tenant's published key set.

use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::jwk::{Jwk, JwkSet};
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, warn};

use propilot_types::AuthSettings;

use crate::claims::Claims;
use crate::error::AuthError;
use crate::verifier::TokenVerifier;

#[derive(Debug, Clone)]
struct Endpoint {
    jwks_url: String,
    issuer: String,
    audience: String,
}

/// Minimum spacing between refetches triggered by an unknown `kid`
pub const DEFAULT_MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug)]
struct CachedKeys {
    keys: JwkSet,
    fetched_at: Instant,
}

#[derive(Debug, Default)]
struct KeyCache {
    current: Option<CachedKeys>,
    /// Last refetch of a still-fresh key set
    last_forced_refresh: Option<Instant>,
}

impl KeyCache {
    fn fresh(&self, ttl: Duration) -> Option<&JwkSet> {
        self.current
            .as_ref()
            .filter(|cached| cached.fetched_at.elapsed() < ttl)
            .map(|cached| &cached.keys)
    }
}

/// Verifies Auth0-issued access tokens.
///
/// Keys are fetched lazily and cached for the configured TTL. A token whose
/// `kid` is not in a fresh cache triggers a refetch, at most once per
/// refresh interval; otherwise it is rejected without a network call.
/// Without a domain and audience every token is rejected.
pub struct Auth0Verifier {
    endpoint: Option<Endpoint>,
    client: reqwest::Client,
    ttl: Duration,
    min_refresh_interval: Duration,
    cache: RwLock<KeyCache>,
}

impl Auth0Verifier {
    /// Verifier for explicit endpoints.
    pub fn new(
        jwks_url: impl Into<String>,
        issuer: impl Into<String>,
        audience: impl Into<String>,
        ttl: Duration,
        timeout: Duration,
    ) -> Result<Self, AuthError> {
        Ok(Self {
            endpoint: Some(Endpoint {
                jwks_url: jwks_url.into(),
                issuer: issuer.into(),
                audience: audience.into(),
            }),
            client: build_client(timeout)?,
            ttl,
            min_refresh_interval: DEFAULT_MIN_REFRESH_INTERVAL,
            cache: RwLock::new(KeyCache::default()),
        })
    }

    /// Verifier for the tenant named in `settings`.
    pub fn from_settings(settings: &AuthSettings) -> Result<Self, AuthError> {
        let timeout = Duration::from_secs(settings.timeout_secs);
        let ttl = Duration::from_secs(settings.jwks_cache_secs);

        match (settings.jwks_url(), settings.issuer(), settings.audience.clone()) {
            (Some(jwks_url), Some(issuer), Some(audience)) => {
                Self::new(jwks_url, issuer, audience, ttl, timeout)
            }
            _ => {
                warn!("AUTH0_DOMAIN or API_IDENTIFIER not set; all authenticated requests will be rejected");
                Ok(Self {
                    endpoint: None,
                    client: build_client(timeout)?,
                    ttl,
                    min_refresh_interval: DEFAULT_MIN_REFRESH_INTERVAL,
                    cache: RwLock::new(KeyCache::default()),
                })
            }
        }
    }

    /// Override how often an unknown `kid` may force a refetch.
    pub fn with_min_refresh_interval(mut self, interval: Duration) -> Self {
        self.min_refresh_interval = interval;
        self
    }

    pub fn is_configured(&self) -> bool {
        self.endpoint.is_some()
    }

    async fn signing_key(&self, endpoint: &Endpoint, kid: &str) -> Result<Jwk, AuthError> {
        if let Some(jwk) = self.cache.read().await.fresh(self.ttl).and_then(|keys| keys.find(kid)) {
            return Ok(jwk.clone());
        }

        // Fetches are serialized; waiters re-check what the winner stored.
        let mut cache = self.cache.write().await;
        let forced = match cache.fresh(self.ttl) {
            Some(keys) => {
                if let Some(jwk) = keys.find(kid) {
                    return Ok(jwk.clone());
                }
                let recently = cache
                    .last_forced_refresh
                    .is_some_and(|at| at.elapsed() < self.min_refresh_interval);
                if recently {
                    return Err(unknown_key(kid));
                }
                true
            }
            None => false,
        };

        let keys = self.fetch_keys(endpoint).await?;
        let now = Instant::now();
        if forced {
            debug!(kid, "Refetched signing keys for unknown kid");
            cache.last_forced_refresh = Some(now);
        }
        let found = keys.find(kid).cloned();
        cache.current = Some(CachedKeys {
            keys,
            fetched_at: now,
        });

        found.ok_or_else(|| unknown_key(kid))
    }

    async fn fetch_keys(&self, endpoint: &Endpoint) -> Result<JwkSet, AuthError> {
        debug!(url = %endpoint.jwks_url, "Fetching signing keys");
        let response = self
            .client
            .get(&endpoint.jwks_url)
            .send()
            .await
            .map_err(|e| AuthError::KeySetUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::KeySetUnavailable(format!(
                "key set endpoint returned {}",
                status
            )));
        }

        response
            .json::<JwkSet>()
            .await
            .map_err(|e| AuthError::KeySetUnavailable(format!("malformed key set: {}", e)))
    }
}

#[async_trait]
impl TokenVerifier for Auth0Verifier {
    async fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let endpoint = self.endpoint.as_ref().ok_or(AuthError::NotConfigured)?;

        let header = decode_header(token).map_err(|e| AuthError::InvalidToken(e.to_string()))?;
        if header.alg != Algorithm::RS256 {
            return Err(AuthError::InvalidToken(format!(
                "unsupported algorithm {:?}",
                header.alg
            )));
        }
        let kid = header
            .kid
            .ok_or_else(|| AuthError::InvalidToken("token header has no kid".to_string()))?;

        let jwk = self.signing_key(endpoint, &kid).await?;
        let key = DecodingKey::from_jwk(&jwk).map_err(|e| AuthError::InvalidToken(e.to_string()))?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[endpoint.audience.as_str()]);
        validation.set_issuer(&[endpoint.issuer.as_str()]);

        let data = decode::<Claims>(token, &key, &validation)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;
        Ok(data.claims)
    }

    fn name(&self) -> &'static str {
        "auth0"
    }
}

fn unknown_key(kid: &str) -> AuthError {
    AuthError::InvalidToken(format!("unknown signing key '{}'", kid))
}

fn build_client(timeout: Duration) -> Result<reqwest::Client, AuthError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| AuthError::KeySetUnavailable(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_settings_are_unconfigured() {
        let settings = AuthSettings {
            domain: Some("tenant.auth0.com".to_string()),
            ..Default::default()
        };
        let verifier = Auth0Verifier::from_settings(&settings).unwrap();
        assert!(!verifier.is_configured());
    }

    #[test]
    fn test_full_settings_are_configured() {
        let settings = AuthSettings {
            domain: Some("tenant.auth0.com".to_string()),
            audience: Some("https://api.propilot".to_string()),
            ..Default::default()
        };
        let verifier = Auth0Verifier::from_settings(&settings).unwrap();
        assert!(verifier.is_configured());
        let endpoint = verifier.endpoint.as_ref().unwrap();
        assert_eq!(endpoint.issuer, "https://tenant.auth0.com/");
        assert_eq!(endpoint.jwks_url, "https://tenant.auth0.com/.well-known/jwks.json");
    }

    #[tokio::test]
    async fn test_garbage_token_rejected_before_fetch() {
        let verifier = Auth0Verifier::new(
            "http://127.0.0.1:9/jwks.json",
            "https://issuer/",
            "aud",
            Duration::from_secs(60),
            Duration::from_secs(1),
        )
        .unwrap();
        let err = verifier.verify("not-a-jwt").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken(_)));
    }
}
