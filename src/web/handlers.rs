use crate::{
    auth::AuthenticatedUser,
    services::{display_location, UserProfile, WeatherError},
    AppState,
};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::sync::Arc;

/// Public health endpoint - no authentication required
pub async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "message": format!("{} is running", state.config.service_name),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Liveness check - always returns OK if the process is running
pub async fn healthz_handler() -> impl IntoResponse {
    StatusCode::OK
}

/// Readiness check - checks if the service is ready to handle requests
///
/// Returns 200 OK once the JWKS cache has been populated, 503 before that
/// (identity provider not yet contacted or unreachable).
pub async fn readyz_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    if state.jwt_validator.jwks().is_cached().await {
        (StatusCode::OK, "ready")
    } else {
        tracing::warn!("Readiness check failed: JWKS not cached");
        (StatusCode::SERVICE_UNAVAILABLE, "not ready: JWKS not cached")
    }
}

pub async fn profile_handler(AuthenticatedUser { payload, .. }: AuthenticatedUser) -> impl IntoResponse {
    let user = UserProfile::from_payload(&payload);

    Json(json!({
        "user": user,
        "message": "User profile retrieved successfully",
    }))
}

pub async fn weather_handler(
    State(state): State<Arc<AppState>>,
    Path(city): Path<String>,
    AuthenticatedUser { payload, .. }: AuthenticatedUser,
) -> Response {
    let weather = match state.weather.get_weather(&city).await {
        Ok(weather) => weather,
        Err(WeatherError::EmptyCity) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": "City must be provided"})),
            )
                .into_response();
        }
        Err(e) => {
            tracing::warn!(city = %city, error = %e, "Weather lookup failed");
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "error": "Failed to fetch weather data",
                    "detail": e.to_string(),
                })),
            )
                .into_response();
        }
    };

    let user = UserProfile::from_payload(&payload);

    Json(json!({
        "user": user,
        "weather": weather,
        "location": display_location(&city),
        "message": "Weather data retrieved successfully",
    }))
    .into_response()
}

pub async fn not_found_handler() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(json!({"error": "Not found"})))
}
