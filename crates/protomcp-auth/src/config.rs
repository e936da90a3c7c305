//! OAuth configuration (spec.md §3 "OAuth configuration"): the data model an
//! HTTP transport hands to this crate to decide whether to validate tokens
//! locally, proxy them transparently to an upstream issuer, or both.

use std::sync::Arc;

use async_trait::async_trait;
use url::Url;

use crate::error::{AuthError, Result};
use crate::jwks::JwksClient;
use crate::validator::{JwtValidationResult, JwtValidator};
use crate::{discovery, ProtectedResourceMetadata};

/// Outcome of validating a bearer token, the `TokenValidator(token) ->
/// Authorized | Unauthorized(reason)` contract from spec.md §4.8.
#[derive(Debug, Clone)]
pub enum Authorization {
    Authorized(JwtValidationResult),
    Unauthorized(String),
}

/// A pluggable validator — the default is [`JwtValidator`], but an embedder
/// may swap in introspection or an API-key scheme instead.
#[async_trait]
pub trait TokenValidator: Send + Sync {
    async fn validate(&self, token: &str) -> Authorization;
}

#[async_trait]
impl TokenValidator for JwtValidator {
    async fn validate(&self, token: &str) -> Authorization {
        match self.validate_with_refresh(token).await {
            Ok(result) => Authorization::Authorized(result),
            Err(err) => Authorization::Unauthorized(err.to_string()),
        }
    }
}

/// `{issuer, authorizationEndpoint, tokenEndpoint, introspectionEndpoint?,
/// jwksEndpoint?, registrationEndpoint?, audience?, clientID?, clientSecret?,
/// transparentProxy, tokenValidator?}` (spec.md §3).
#[derive(Clone)]
pub struct OAuthConfig {
    pub issuer: Url,
    pub authorization_endpoint: Url,
    pub token_endpoint: Url,
    pub introspection_endpoint: Option<Url>,
    pub jwks_endpoint: Option<Url>,
    pub registration_endpoint: Option<Url>,
    pub userinfo_endpoint: Option<Url>,
    pub audience: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub transparent_proxy: bool,
    pub token_validator: Option<Arc<dyn TokenValidator>>,
}

impl std::fmt::Debug for OAuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthConfig")
            .field("issuer", &self.issuer)
            .field("transparent_proxy", &self.transparent_proxy)
            .field("audience", &self.audience)
            .field("has_token_validator", &self.token_validator.is_some())
            .finish()
    }
}

impl OAuthConfig {
    /// Derive a full config from just the issuer, per spec.md §3: "Derived
    /// at runtime from `/.well-known/openid-configuration` when only
    /// `issuer` is supplied."
    pub async fn from_issuer(issuer: Url, audience: Option<String>, transparent_proxy: bool) -> Result<Self> {
        let http_client = reqwest::Client::new();
        let doc = discovery::discover(issuer.as_str(), &http_client).await?;

        let parse = |s: &str| -> Result<Url> {
            Url::parse(s).map_err(|e| AuthError::DiscoveryFailed {
                issuer: issuer.to_string(),
                reason: format!("invalid URL in discovery document: {e}"),
            })
        };

        let authorization_endpoint = doc
            .authorization_endpoint
            .as_deref()
            .map(parse)
            .transpose()?
            .ok_or_else(|| AuthError::DiscoveryFailed {
                issuer: issuer.to_string(),
                reason: "discovery document has no authorization_endpoint".into(),
            })?;
        let token_endpoint = doc
            .token_endpoint
            .as_deref()
            .map(parse)
            .transpose()?
            .ok_or_else(|| AuthError::DiscoveryFailed {
                issuer: issuer.to_string(),
                reason: "discovery document has no token_endpoint".into(),
            })?;

        let jwks_client = Arc::new(JwksClient::new(doc.jwks_uri.clone()));
        let validator = JwtValidator::with_jwks_client(
            issuer.to_string(),
            audience.clone().unwrap_or_default(),
            jwks_client,
        );

        Ok(Self {
            issuer,
            authorization_endpoint,
            token_endpoint,
            introspection_endpoint: doc.introspection_endpoint.as_deref().map(parse).transpose()?,
            jwks_endpoint: Url::parse(&doc.jwks_uri).ok(),
            registration_endpoint: doc.registration_endpoint.as_deref().map(parse).transpose()?,
            userinfo_endpoint: doc.userinfo_endpoint.as_deref().map(parse).transpose()?,
            audience,
            client_id: None,
            client_secret: None,
            transparent_proxy,
            token_validator: Some(Arc::new(validator)),
        })
    }

    /// Build from explicit endpoints, no discovery round trip.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        issuer: Url,
        authorization_endpoint: Url,
        token_endpoint: Url,
        jwks_endpoint: Url,
        audience: Option<String>,
        transparent_proxy: bool,
    ) -> Self {
        let jwks_client = Arc::new(JwksClient::new(jwks_endpoint.to_string()));
        let validator = JwtValidator::with_jwks_client(
            issuer.to_string(),
            audience.clone().unwrap_or_default(),
            jwks_client,
        );
        Self {
            issuer,
            authorization_endpoint,
            token_endpoint,
            introspection_endpoint: None,
            jwks_endpoint: Some(jwks_endpoint),
            registration_endpoint: None,
            userinfo_endpoint: None,
            audience,
            client_id: None,
            client_secret: None,
            transparent_proxy,
            token_validator: Some(Arc::new(validator)),
        }
    }

    /// The discovery document this config would advertise, rewritten so a
    /// client targets the local proxy instead of the upstream issuer when
    /// `transparent_proxy` is set (spec.md §4.8 "swaps its own base URL
    /// into the issuer/authorization/token fields").
    pub fn metadata_document(&self, proxy_base_url: Option<&Url>) -> serde_json::Value {
        let base = if self.transparent_proxy { proxy_base_url } else { None };
        let rewrite = |endpoint: &Url| -> String {
            match base {
                Some(base) => rewrite_to_base(endpoint, base),
                None => endpoint.to_string(),
            }
        };
        serde_json::json!({
            "issuer": base.map(|b| b.to_string()).unwrap_or_else(|| self.issuer.to_string()),
            "authorization_endpoint": rewrite(&self.authorization_endpoint),
            "token_endpoint": rewrite(&self.token_endpoint),
            "jwks_uri": self.jwks_endpoint.as_ref().map(|u| rewrite(u)),
            "registration_endpoint": self.registration_endpoint.as_ref().map(|u| rewrite(u)),
            "introspection_endpoint": self.introspection_endpoint.as_ref().map(|u| rewrite(u)),
        })
    }

    pub async fn validate_token(&self, token: &str) -> Authorization {
        match &self.token_validator {
            Some(validator) => validator.validate(token).await,
            None => Authorization::Unauthorized("no token validator configured".to_string()),
        }
    }
}

fn rewrite_to_base(endpoint: &Url, base: &Url) -> String {
    format!("{}{}", base.as_str().trim_end_matches('/'), endpoint.path())
}

/// RFC 9728 Protected Resource Metadata (`/.well-known/oauth-protected-resource`).
#[derive(Debug, Clone, serde::Serialize)]
pub struct ProtectedResourceMetadataDoc {
    pub resource: String,
    pub authorization_servers: Vec<String>,
    pub scopes_supported: Vec<String>,
    pub bearer_methods_supported: Vec<String>,
}

impl From<&ProtectedResourceMetadata> for ProtectedResourceMetadataDoc {
    fn from(meta: &ProtectedResourceMetadata) -> Self {
        Self {
            resource: meta.resource.clone(),
            authorization_servers: vec![meta.authorization_server.clone()],
            scopes_supported: meta.scopes.clone(),
            bearer_methods_supported: vec!["header".to_string()],
        }
    }
}
