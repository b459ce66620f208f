//! Pure helper functions for authentication
//!
//! Bearer token extraction, token fingerprints for audit logs, and the
//! outbound HTTP client builder.

use axum::http::{header::AUTHORIZATION, HeaderMap};
use std::time::Duration;

// =============================================================================
// Bearer Token Extraction
// =============================================================================

/// Why a request carries no usable bearer token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BearerError {
    /// No Authorization header, or a scheme other than Bearer
    Missing,
    /// `Bearer` with nothing after it
    Empty,
}

/// Extract the bearer token from the Authorization header
///
/// The scheme is matched case-insensitively and the token is trimmed.
/// Only the first Authorization header is considered.
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<String, BearerError> {
    let value = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .ok_or(BearerError::Missing)?;

    let (scheme, rest) = match value.split_once(char::is_whitespace) {
        Some((scheme, rest)) => (scheme, rest),
        None => (value, ""),
    };

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(BearerError::Missing);
    }

    let token = rest.trim();
    if token.is_empty() {
        return Err(BearerError::Empty);
    }

    Ok(token.to_string())
}

// =============================================================================
// Audit Helpers
// =============================================================================

/// md5 fingerprint of a token, safe to log
pub fn token_fingerprint(token: &str) -> String {
    format!("{:x}", md5::compute(token))
}

// =============================================================================
// HTTP Client Builders
// =============================================================================

/// Create a reqwest client for outbound requests (JWKS, weather) using config timeouts
pub fn create_http_client(
    connect_timeout_secs: u64,
    request_timeout_secs: u64,
) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::ClientBuilder::new()
        .redirect(reqwest::redirect::Policy::none()) // Security: prevent SSRF
        .connect_timeout(Duration::from_secs(connect_timeout_secs))
        .timeout(Duration::from_secs(request_timeout_secs))
        .build()
}
