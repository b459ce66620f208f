//! Portal API service library
//!
//! Keycloak-protected JSON API: JWKS caching, bearer token validation, and
//! the profile / weather endpoints built on top of them.

#![deny(dead_code)]

pub mod auth;
pub mod config;
pub mod services;
pub mod web;

use auth::{create_http_client, JwksCache, JwtValidator, ValidationOptions};
use config::Config;
use services::WeatherService;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub jwt_validator: Arc<JwtValidator>,
    pub weather: Arc<WeatherService>,
}

impl AppState {
    /// Wire the JWKS cache, validator and weather client from configuration.
    ///
    /// Nothing is fetched here; call `prefetch` on the JWKS cache to warm it.
    pub fn from_config(config: Config) -> anyhow::Result<Self> {
        let client = create_http_client(
            config.http_connect_timeout_secs,
            config.http_request_timeout_secs,
        )
        .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {}", e))?;

        let jwks = Arc::new(JwksCache::new(
            config.jwks_url.clone(),
            client.clone(),
            Duration::from_secs(config.jwks_cache_ttl_secs),
            Duration::from_secs(config.jwks_min_refresh_interval_secs),
        ));

        let jwt_validator = Arc::new(JwtValidator::new(
            ValidationOptions {
                issuer: config.issuer.clone(),
                audience: config.audience.clone(),
                algorithms: config.jwt_algorithms.clone(),
                leeway_secs: config.jwt_leeway_secs,
            },
            jwks,
        ));

        let weather = Arc::new(WeatherService::new(config.weather_api_url.clone(), client));

        Ok(Self {
            config: Arc::new(config),
            jwt_validator,
            weather,
        })
    }
}
