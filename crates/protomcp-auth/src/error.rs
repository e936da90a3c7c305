//! JWT and OAuth error taxonomy (spec.md §7 "JWT": `InvalidFormat`,
//! `InvalidBase64`, `InvalidJSON`, `UnsupportedAlgorithm`,
//! `SignatureVerificationFailed`, `JWKSFetchFailed`, `KeyNotFound`,
//! `Expired`, `NotYetValid`, `InvalidIssuer/Audience/AuthorizedParty`,
//! `JWENotSupported`).

/// Result alias for this crate.
pub type Result<T> = std::result::Result<T, AuthError>;

#[derive(Debug, thiserror::Error, Clone)]
pub enum AuthError {
    #[error("JWT is not a three-segment compact token: {0}")]
    InvalidFormat(String),

    #[error("JWT segment is not valid base64url: {0}")]
    InvalidBase64(String),

    #[error("JWT segment did not decode to valid JSON: {0}")]
    InvalidJSON(String),

    #[error("Algorithm '{0}' is not supported; only RS256 is accepted")]
    UnsupportedAlgorithm(String),

    #[error("JWT signature verification failed: {0}")]
    SignatureVerificationFailed(String),

    #[error("Failed to fetch JWKS from {uri}: {reason}")]
    JWKSFetchFailed { uri: String, reason: String },

    #[error("No JWKS key found for kid '{0}'")]
    KeyNotFound(String),

    #[error("Token expired at {0}")]
    Expired(String),

    #[error("Token not valid until {0}")]
    NotYetValid(String),

    #[error("Expected issuer '{expected}', got '{actual}'")]
    InvalidIssuer { expected: String, actual: String },

    #[error("Expected audience '{expected}' not present in token audience {actual:?}")]
    InvalidAudience { expected: String, actual: Vec<String> },

    #[error("Expected authorized party '{expected}', got '{actual}'")]
    InvalidAuthorizedParty { expected: String, actual: String },

    #[error("Five-segment JWE tokens are not supported, only compact JWS")]
    JWENotSupported,

    #[error("OIDC discovery failed for issuer '{issuer}': {reason}")]
    DiscoveryFailed { issuer: String, reason: String },
}
