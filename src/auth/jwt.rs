use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, Algorithm, Validation};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

use super::helpers::token_fingerprint;
use super::jwks::{JwksCache, JwksError};

/// Decoded claims of a verified access token
///
/// Holds every claim the provider put in the token; the accessors cover the
/// standard OIDC profile claims and Keycloak's realm roles.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenPayload(Map<String, Value>);

impl TokenPayload {
    pub fn new(claims: Map<String, Value>) -> Self {
        Self(claims)
    }

    pub fn claims(&self) -> &Map<String, Value> {
        &self.0
    }

    /// String claim by name; non-string values are ignored
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(Value::as_str)
    }

    pub fn sub(&self) -> Option<&str> {
        self.get_str("sub")
    }

    pub fn preferred_username(&self) -> Option<&str> {
        self.get_str("preferred_username")
    }

    pub fn email(&self) -> Option<&str> {
        self.get_str("email")
    }

    pub fn given_name(&self) -> Option<&str> {
        self.get_str("given_name")
    }

    pub fn family_name(&self) -> Option<&str> {
        self.get_str("family_name")
    }

    pub fn name(&self) -> Option<&str> {
        self.get_str("name")
    }

    /// Realm roles from Keycloak's `realm_access.roles`
    pub fn roles(&self) -> Vec<String> {
        self.0
            .get("realm_access")
            .and_then(|ra| ra.get("roles"))
            .and_then(Value::as_array)
            .map(|roles| {
                roles
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Why a token was rejected
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("Malformed token: {0}")]
    Malformed(String),

    #[error("Token algorithm {0:?} is not allowed")]
    DisallowedAlgorithm(Algorithm),

    #[error("Token algorithm {token:?} does not match key algorithm {key:?}")]
    AlgorithmMismatch { token: Algorithm, key: Algorithm },

    #[error("Token has expired")]
    Expired,

    #[error("Token is not valid yet")]
    NotYetValid,

    #[error("Invalid token signature")]
    InvalidSignature,

    #[error("Invalid token issuer")]
    InvalidIssuer,

    #[error("Invalid token audience")]
    InvalidAudience,

    #[error("Token is missing required claim: {0}")]
    MissingClaim(String),

    #[error(transparent)]
    KeySet(#[from] JwksError),

    #[error("Token validation failed: {0}")]
    Invalid(String),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        match e.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::ImmatureSignature => TokenError::NotYetValid,
            ErrorKind::InvalidSignature => TokenError::InvalidSignature,
            ErrorKind::InvalidIssuer => TokenError::InvalidIssuer,
            ErrorKind::InvalidAudience => TokenError::InvalidAudience,
            ErrorKind::MissingRequiredClaim(claim) => TokenError::MissingClaim(claim.clone()),
            ErrorKind::InvalidToken
            | ErrorKind::Base64(_)
            | ErrorKind::Json(_)
            | ErrorKind::Utf8(_) => TokenError::Malformed(e.to_string()),
            _ => TokenError::Invalid(e.to_string()),
        }
    }
}

/// Rules a token must satisfy besides a valid signature
#[derive(Debug, Clone)]
pub struct ValidationOptions {
    /// Expected `iss`; not checked when `None`
    pub issuer: Option<String>,
    /// Expected `aud` (string or array form); not checked when `None`
    pub audience: Option<String>,
    /// Accepted JWS algorithms
    pub algorithms: Vec<Algorithm>,
    /// Clock skew tolerance for `exp` and `nbf`
    pub leeway_secs: u64,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            issuer: None,
            audience: None,
            algorithms: vec![Algorithm::RS256],
            leeway_secs: 60,
        }
    }
}

pub struct JwtValidator {
    options: ValidationOptions,
    jwks: Arc<JwksCache>,
}

impl JwtValidator {
    pub fn new(options: ValidationOptions, jwks: Arc<JwksCache>) -> Self {
        tracing::info!(
            jwks_url = %jwks.jwks_url(),
            expected_issuer = ?options.issuer,
            expected_audience = ?options.audience,
            algorithms = ?options.algorithms,
            leeway_secs = options.leeway_secs,
            "JWT validator initialized"
        );

        Self { options, jwks }
    }

    pub fn jwks(&self) -> &JwksCache {
        &self.jwks
    }

    /// Verify signature, lifetime, issuer and audience, and return the claims.
    /// Fetches JWKS if not cached or expired.
    pub async fn validate(&self, token: &str) -> Result<TokenPayload, TokenError> {
        tracing::debug!(token_len = token.len(), "Validating JWT token");

        let result = self.validate_inner(token).await;

        match &result {
            Ok(payload) => {
                tracing::info!(
                    sub = ?payload.sub(),
                    username = ?payload.preferred_username(),
                    roles = ?payload.roles(),
                    "Token validated successfully"
                );
            }
            Err(e) => {
                // Audit trail without leaking the token itself
                tracing::warn!(
                    error = %e,
                    token_hash = %token_fingerprint(token),
                    token_len = token.len(),
                    "JWT validation failed"
                );
            }
        }

        result
    }

    async fn validate_inner(&self, token: &str) -> Result<TokenPayload, TokenError> {
        let header = decode_header(token).map_err(|e| TokenError::Malformed(e.to_string()))?;

        if !self.options.algorithms.contains(&header.alg) {
            return Err(TokenError::DisallowedAlgorithm(header.alg));
        }

        let signing_key = self.jwks.get_key(header.kid.as_deref()).await?;

        if let Some(key_alg) = signing_key.algorithm {
            if key_alg != header.alg {
                return Err(TokenError::AlgorithmMismatch {
                    token: header.alg,
                    key: key_alg,
                });
            }
        }

        let validation = self.build_validation(header.alg);
        let token_data = decode::<Map<String, Value>>(token, &signing_key.key, &validation)?;

        Ok(TokenPayload::new(token_data.claims))
    }

    fn build_validation(&self, alg: Algorithm) -> Validation {
        let mut validation = Validation::new(alg);
        validation.leeway = self.options.leeway_secs;
        validation.validate_exp = true;
        validation.validate_nbf = true;

        // jsonwebtoken only checks iss/aud when present, so configured ones are required
        let mut required = vec!["exp"];
        if self.options.issuer.is_some() {
            required.push("iss");
        }
        if self.options.audience.is_some() {
            required.push("aud");
        }
        validation.set_required_spec_claims(&required);

        match &self.options.issuer {
            Some(issuer) => validation.set_issuer(&[issuer]),
            None => validation.iss = None,
        }

        match &self.options.audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }

        validation
    }
}
