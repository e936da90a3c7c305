//! RS256 JWT validation (spec.md §4.8 "Validator mode"), grounded on the
//! teacher's `turbomcp-auth::jwt::validator::JwtValidator`. Scoped down to
//! the single algorithm spec.md names (`alg=RS256`) rather than the
//! teacher's ES256/RS256/PS256 allowlist.

use std::sync::Arc;
use std::time::Duration;

use jsonwebtoken::{decode, decode_header, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AuthError, Result};
use crate::jwks::JwksClient;

const DEFAULT_CLOCK_SKEW: Duration = Duration::from_secs(60);

/// The registered claims every validated token carries, plus whatever else
/// the issuer put in the payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardClaims {
    pub iss: String,
    #[serde(default)]
    pub aud: AudienceClaim,
    pub exp: i64,
    #[serde(default)]
    pub nbf: Option<i64>,
    #[serde(default)]
    pub iat: Option<i64>,
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub azp: Option<String>,
    #[serde(flatten)]
    pub extra: std::collections::HashMap<String, Value>,
}

/// `aud` may be a single string or an array of strings on the wire.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AudienceClaim {
    #[default]
    None,
    Single(String),
    Many(Vec<String>),
}

impl AudienceClaim {
    fn contains(&self, expected: &str) -> bool {
        match self {
            AudienceClaim::None => false,
            AudienceClaim::Single(s) => s == expected,
            AudienceClaim::Many(list) => list.iter().any(|a| a == expected),
        }
    }

    fn as_vec(&self) -> Vec<String> {
        match self {
            AudienceClaim::None => Vec::new(),
            AudienceClaim::Single(s) => vec![s.clone()],
            AudienceClaim::Many(list) => list.clone(),
        }
    }
}

/// A successfully validated token: the claims plus the key metadata used to
/// verify it.
#[derive(Debug, Clone)]
pub struct JwtValidationResult {
    pub claims: StandardClaims,
    pub key_id: String,
}

/// Validates RS256-signed JWTs against a single issuer's JWKS.
pub struct JwtValidator {
    expected_issuer: String,
    expected_audience: String,
    expected_authorized_party: Option<String>,
    jwks_client: Arc<JwksClient>,
    clock_skew: Duration,
}

impl std::fmt::Debug for JwtValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtValidator")
            .field("expected_issuer", &self.expected_issuer)
            .field("expected_audience", &self.expected_audience)
            .finish()
    }
}

impl JwtValidator {
    /// Build a validator that already knows its JWKS endpoint — skips OIDC
    /// discovery.
    pub fn with_jwks_uri(issuer: impl Into<String>, audience: impl Into<String>, jwks_uri: impl Into<String>) -> Self {
        Self {
            expected_issuer: issuer.into(),
            expected_audience: audience.into(),
            expected_authorized_party: None,
            jwks_client: Arc::new(JwksClient::new(jwks_uri)),
            clock_skew: DEFAULT_CLOCK_SKEW,
        }
    }

    /// Build a validator that shares an already-constructed JWKS client
    /// (e.g. one the OAuth config built during discovery).
    pub fn with_jwks_client(issuer: impl Into<String>, audience: impl Into<String>, jwks_client: Arc<JwksClient>) -> Self {
        Self {
            expected_issuer: issuer.into(),
            expected_audience: audience.into(),
            expected_authorized_party: None,
            jwks_client,
            clock_skew: DEFAULT_CLOCK_SKEW,
        }
    }

    pub fn with_clock_skew(mut self, skew: Duration) -> Self {
        self.clock_skew = skew;
        self
    }

    pub fn with_authorized_party(mut self, azp: impl Into<String>) -> Self {
        self.expected_authorized_party = Some(azp.into());
        self
    }

    /// Validate a compact JWS. Performs the checks spec.md §4.8 lists in
    /// order: segment count, header algorithm, `kid` lookup, signature,
    /// then claims.
    pub async fn validate(&self, token: &str) -> Result<JwtValidationResult> {
        let segment_count = token.matches('.').count() + 1;
        if segment_count == 5 {
            return Err(AuthError::JWENotSupported);
        }
        if segment_count != 3 {
            return Err(AuthError::InvalidFormat(format!("expected 3 segments, found {segment_count}")));
        }

        let header = decode_header(token).map_err(|e| AuthError::InvalidFormat(e.to_string()))?;
        if header.alg != Algorithm::RS256 {
            return Err(AuthError::UnsupportedAlgorithm(format!("{:?}", header.alg)));
        }
        let kid = header.kid.ok_or_else(|| AuthError::KeyNotFound("<missing kid>".to_string()))?;

        let jwks = self.jwks_client.get_jwks().await?;
        let key = jwks.find(&kid).ok_or_else(|| AuthError::KeyNotFound(kid.clone()))?;
        let decoding_key =
            DecodingKey::from_jwk(key).map_err(|e| AuthError::KeyNotFound(format!("{kid}: {e}")))?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[&self.expected_issuer]);
        validation.set_audience(&[&self.expected_audience]);
        validation.leeway = self.clock_skew.as_secs();

        let token_data = decode::<StandardClaims>(token, &decoding_key, &validation).map_err(|err| {
            map_decode_error(err.kind(), &self.expected_issuer, &self.expected_audience, token)
        })?;

        if let Some(expected_azp) = &self.expected_authorized_party {
            let actual = token_data.claims.azp.clone().unwrap_or_default();
            if &actual != expected_azp {
                return Err(AuthError::InvalidAuthorizedParty {
                    expected: expected_azp.clone(),
                    actual,
                });
            }
        }

        Ok(JwtValidationResult {
            claims: token_data.claims,
            key_id: kid,
        })
    }

    /// Retry once against a freshly-fetched JWKS before giving up — covers
    /// the case where the issuer rotated keys since our last fetch.
    pub async fn validate_with_refresh(&self, token: &str) -> Result<JwtValidationResult> {
        match self.validate(token).await {
            Ok(result) => Ok(result),
            Err(AuthError::KeyNotFound(_)) => {
                self.jwks_client.refresh().await?;
                self.validate(token).await
            }
            Err(other) => Err(other),
        }
    }
}

fn map_decode_error(kind: &ErrorKind, expected_issuer: &str, expected_audience: &str, token: &str) -> AuthError {
    match kind {
        ErrorKind::ExpiredSignature => AuthError::Expired(unverified_claim(token, "exp")),
        ErrorKind::ImmatureSignature => AuthError::NotYetValid(unverified_claim(token, "nbf")),
        ErrorKind::InvalidIssuer => AuthError::InvalidIssuer {
            expected: expected_issuer.to_string(),
            actual: unverified_claim(token, "iss"),
        },
        ErrorKind::InvalidAudience => AuthError::InvalidAudience {
            expected: expected_audience.to_string(),
            actual: unverified_audience(token),
        },
        ErrorKind::InvalidSignature => AuthError::SignatureVerificationFailed("signature mismatch".to_string()),
        other => AuthError::SignatureVerificationFailed(format!("{other:?}")),
    }
}

/// Best-effort peek at a claim without verifying the signature, used only to
/// populate error messages after validation has already failed.
fn unverified_claim(token: &str, claim: &str) -> String {
    decode_payload(token)
        .and_then(|v| v.get(claim).and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| "<unknown>".to_string())
}

fn unverified_audience(token: &str) -> Vec<String> {
    decode_payload(token)
        .and_then(|v| serde_json::from_value::<AudienceClaim>(v.get("aud")?.clone()).ok())
        .map(|a| a.as_vec())
        .unwrap_or_default()
}

fn decode_payload(token: &str) -> Option<Value> {
    use base64::Engine;
    let payload = token.split('.').nth(1)?;
    let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD.decode(payload).ok()?;
    serde_json::from_slice(&bytes).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audience_claim_matches_single_and_many() {
        assert!(AudienceClaim::Single("api".into()).contains("api"));
        assert!(AudienceClaim::Many(vec!["a".into(), "api".into()]).contains("api"));
        assert!(!AudienceClaim::None.contains("api"));
    }

    #[tokio::test]
    async fn rejects_five_segment_token_as_jwe() {
        let validator = JwtValidator::with_jwks_uri("https://idp/", "api", "https://idp/jwks");
        let err = validator.validate("a.b.c.d.e").await.unwrap_err();
        assert!(matches!(err, AuthError::JWENotSupported));
    }

    #[tokio::test]
    async fn rejects_malformed_token() {
        let validator = JwtValidator::with_jwks_uri("https://idp/", "api", "https://idp/jwks");
        let err = validator.validate("not-a-jwt").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidFormat(_)));
    }
}
