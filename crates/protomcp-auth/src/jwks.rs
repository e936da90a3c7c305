//! JWKS fetch-and-cache (spec.md §4.8 "JWKS fetch+cache"), grounded on the
//! teacher's `turbomcp-auth::jwt::jwks` module: a single cached document with
//! a TTL, refreshed no more often than `min_refresh_interval` even when a
//! validation failure asks for an immediate refresh.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use jsonwebtoken::jwk::{Jwk, JwkSet};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::{AuthError, Result};

const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(600);
const DEFAULT_MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(5);
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

struct CachedJwks {
    jwks: Arc<JwkSet>,
    cached_at: SystemTime,
    ttl: Duration,
}

impl CachedJwks {
    fn is_valid(&self) -> bool {
        SystemTime::now()
            .duration_since(self.cached_at)
            .map(|age| age < self.ttl)
            .unwrap_or(false)
    }
}

/// Fetches and caches a single issuer's JWKS document.
pub struct JwksClient {
    jwks_uri: String,
    http_client: reqwest::Client,
    cache: RwLock<Option<CachedJwks>>,
    cache_ttl: Duration,
    min_refresh_interval: Duration,
    last_refresh: RwLock<Option<SystemTime>>,
}

impl std::fmt::Debug for JwksClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwksClient").field("jwks_uri", &self.jwks_uri).finish()
    }
}

impl JwksClient {
    pub fn new(jwks_uri: impl Into<String>) -> Self {
        Self::with_ttl(jwks_uri, DEFAULT_CACHE_TTL)
    }

    pub fn with_ttl(jwks_uri: impl Into<String>, ttl: Duration) -> Self {
        Self {
            jwks_uri: jwks_uri.into(),
            http_client: reqwest::Client::builder()
                .timeout(HTTP_TIMEOUT)
                .build()
                .expect("reqwest client builds with a fixed timeout"),
            cache: RwLock::new(None),
            cache_ttl: ttl,
            min_refresh_interval: DEFAULT_MIN_REFRESH_INTERVAL,
            last_refresh: RwLock::new(None),
        }
    }

    pub fn jwks_uri(&self) -> &str {
        &self.jwks_uri
    }

    /// Return the cached JWKS, fetching it first if the cache is cold or
    /// stale.
    pub async fn get_jwks(&self) -> Result<Arc<JwkSet>> {
        if let Some(cached) = self.cache.read().await.as_ref() {
            if cached.is_valid() {
                return Ok(cached.jwks.clone());
            }
        }
        self.fetch_and_cache().await
    }

    /// Force a re-fetch, rate-limited so a burst of validation failures
    /// doesn't hammer the issuer.
    pub async fn refresh(&self) -> Result<Arc<JwkSet>> {
        let too_soon = self
            .last_refresh
            .read()
            .await
            .map(|t| SystemTime::now().duration_since(t).unwrap_or_default() < self.min_refresh_interval)
            .unwrap_or(false);
        if too_soon {
            debug!(uri = %self.jwks_uri, "jwks refresh rate-limited, serving cache instead");
            return self.get_jwks().await;
        }
        self.fetch_and_cache().await
    }

    async fn fetch_and_cache(&self) -> Result<Arc<JwkSet>> {
        if !(self.jwks_uri.starts_with("https://") || self.jwks_uri.starts_with("http://localhost")) {
            return Err(AuthError::JWKSFetchFailed {
                uri: self.jwks_uri.clone(),
                reason: "jwks_uri must be https:// (or http://localhost for tests)".into(),
            });
        }

        let response = self
            .http_client
            .get(&self.jwks_uri)
            .send()
            .await
            .map_err(|e| AuthError::JWKSFetchFailed {
                uri: self.jwks_uri.clone(),
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(AuthError::JWKSFetchFailed {
                uri: self.jwks_uri.clone(),
                reason: format!("HTTP {}", response.status()),
            });
        }

        let jwks: JwkSet = response.json().await.map_err(|e| AuthError::JWKSFetchFailed {
            uri: self.jwks_uri.clone(),
            reason: e.to_string(),
        })?;

        let jwks = Arc::new(jwks);
        *self.cache.write().await = Some(CachedJwks {
            jwks: jwks.clone(),
            cached_at: SystemTime::now(),
            ttl: self.cache_ttl,
        });
        *self.last_refresh.write().await = Some(SystemTime::now());
        debug!(uri = %self.jwks_uri, keys = jwks.keys.len(), "fetched jwks");
        Ok(jwks)
    }

    pub async fn clear_cache(&self) {
        *self.cache.write().await = None;
    }
}

/// Look up a key by `kid` in a fetched key set.
pub fn find_key<'a>(jwks: &'a JwkSet, kid: &str) -> Option<&'a Jwk> {
    jwks.find(kid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sample_jwks() -> serde_json::Value {
        serde_json::json!({
            "keys": [{
                "kty": "RSA",
                "kid": "k1",
                "use": "sig",
                "alg": "RS256",
                "n": "AL8V5udhIQl7G_xvHJUa-rkvoQWOGY9LK_DLQ4dg",
                "e": "AQAB",
            }]
        })
    }

    #[tokio::test]
    async fn fetches_and_caches() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/jwks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(sample_jwks()))
            .expect(1)
            .mount(&server)
            .await;

        let client = JwksClient::new(format!("{}/jwks", server.uri()));
        let first = client.get_jwks().await.unwrap();
        let second = client.get_jwks().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn rejects_non_https_uri() {
        let client = JwksClient::new("ftp://example.com/jwks");
        let err = client.get_jwks().await.unwrap_err();
        assert!(matches!(err, AuthError::JWKSFetchFailed { .. }));
    }

    #[tokio::test]
    async fn refresh_fetches_again_after_min_interval() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/jwks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(sample_jwks()))
            .expect(1..)
            .mount(&server)
            .await;

        let mut client = JwksClient::new(format!("{}/jwks", server.uri()));
        client.min_refresh_interval = Duration::from_millis(0);
        client.get_jwks().await.unwrap();
        let refreshed = client.refresh().await.unwrap();
        assert_eq!(refreshed.keys.len(), 1);
    }
}
