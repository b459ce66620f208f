use crate::auth::helpers::{extract_bearer_token, BearerError};
use crate::auth::jwt::{JwtValidator, TokenPayload};
use axum::{
    extract::FromRequestParts,
    http::{header::WWW_AUTHENTICATE, request::Parts, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;

/// Challenge sent with every 401
pub const BEARER_CHALLENGE: &str = "Bearer realm=\"keycloak\"";

/// Custom authentication error type
#[derive(Debug)]
pub enum AuthError {
    Unauthenticated(String),
    Internal(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            AuthError::Unauthenticated(msg) => (
                StatusCode::UNAUTHORIZED,
                [(WWW_AUTHENTICATE, HeaderValue::from_static(BEARER_CHALLENGE))],
                Json(json!({
                    "error": "Unauthorized",
                    "detail": msg
                })),
            )
                .into_response(),

            AuthError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "Internal server error",
                    "detail": msg
                })),
            )
                .into_response(),
        }
    }
}

/// Authenticated user extractor - validates the bearer token
///
/// Handlers that take this extractor are protected; everything else is
/// anonymous.
///
/// Usage:
/// ```rust,ignore
/// async fn handler(AuthenticatedUser { payload, roles }: AuthenticatedUser) {
///     println!("User: {:?}, Roles: {:?}", payload.sub(), roles);
/// }
/// ```
pub struct AuthenticatedUser {
    pub payload: TokenPayload,
    pub roles: Vec<String>,
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // 1. Extract bearer token from the Authorization header
        let token = extract_bearer_token(&parts.headers).map_err(|e| match e {
            BearerError::Missing => AuthError::Unauthenticated("Missing bearer token.".to_string()),
            BearerError::Empty => AuthError::Unauthenticated("Empty bearer token.".to_string()),
        })?;

        // 2. Get JwtValidator from extensions
        let validator = parts
            .extensions
            .get::<Arc<JwtValidator>>()
            .ok_or_else(|| AuthError::Internal("Missing JwtValidator extension".to_string()))?;

        // 3. Validate JWT asynchronously
        let payload = validator
            .validate(&token)
            .await
            .map_err(|e| AuthError::Unauthenticated(e.to_string()))?;

        let roles = payload.roles();
        if roles.is_empty() {
            tracing::debug!(
                user = ?payload.sub(),
                "JWT token has no realm roles"
            );
        }

        Ok(AuthenticatedUser { payload, roles })
    }
}
