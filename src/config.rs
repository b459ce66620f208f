use std::env;
use std::str::FromStr;

use anyhow::Context;
use axum::http::HeaderValue;
use jsonwebtoken::Algorithm;

#[derive(Debug, Clone, PartialEq)]
pub enum Environment {
    Development,
    Production,
}

/// Origins allowed by the CORS layer
#[derive(Debug, Clone, PartialEq)]
pub enum CorsOrigins {
    /// `*` - any origin (no credentials are ever allowed)
    Any,
    /// Explicit allow-list
    List(Vec<HeaderValue>),
}

#[derive(Debug, Clone)]
pub struct Config {
    // Environment configuration
    pub environment: Environment,
    pub service_name: String,

    // Server configuration
    pub server_host: String,
    pub server_port: u16,

    // Token verification
    pub jwks_url: String,
    pub issuer: Option<String>,
    pub audience: Option<String>,
    pub jwt_algorithms: Vec<Algorithm>,
    pub jwt_leeway_secs: u64,

    // JWKS cache configuration (in seconds)
    pub jwks_cache_ttl_secs: u64,
    pub jwks_min_refresh_interval_secs: u64,

    // Weather upstream
    pub weather_api_url: String,

    // HTTP client timeout configuration (in seconds)
    pub http_connect_timeout_secs: u64,
    pub http_request_timeout_secs: u64,

    pub cors_origins: CorsOrigins,
}

impl Config {
    /// Load configuration from the process environment
    pub fn load() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|s| !s.trim().is_empty());
        let number = |key: &str, default: u64| {
            var(key)
                .and_then(|s| s.trim().parse::<u64>().ok())
                .unwrap_or(default)
        };

        let environment = match var("ENVIRONMENT")
            .unwrap_or_else(|| "development".to_string())
            .to_lowercase()
            .as_str()
        {
            "production" | "prod" => Environment::Production,
            _ => Environment::Development,
        };

        let service_name = var("SERVICE_NAME").unwrap_or_else(|| "portal-api".to_string());

        // Keycloak base URL + realm, used to derive the JWKS URL and issuer
        // when they are not given explicitly
        let keycloak_url = var("KEYCLOAK_URL").map(|s| s.trim_end_matches('/').to_string());
        let keycloak_realm = var("KEYCLOAK_REALM");

        let jwks_url = match (var("KEYCLOAK_CERT_URL"), &keycloak_url, &keycloak_realm) {
            (Some(url), _, _) => url,
            (None, Some(base), Some(realm)) => {
                format!("{}/realms/{}/protocol/openid-connect/certs", base, realm)
            }
            _ => anyhow::bail!(
                "KEYCLOAK_CERT_URL environment variable is required (or KEYCLOAK_URL and KEYCLOAK_REALM)"
            ),
        };
        url::Url::parse(&jwks_url)
            .with_context(|| format!("KEYCLOAK_CERT_URL is not a valid URL: {}", jwks_url))?;

        let issuer = var("KEYCLOAK_ISSUER").or_else(|| match (&keycloak_url, &keycloak_realm) {
            (Some(base), Some(realm)) => Some(format!("{}/realms/{}", base, realm)),
            (Some(base), None) => Some(base.clone()),
            _ => None,
        });

        let audience = var("KEYCLOAK_AUDIENCE");

        let jwt_algorithms = parse_algorithms(&var("JWT_ALGORITHMS").unwrap_or_else(|| "RS256".to_string()))?;

        let weather_api_url = var("WEATHER_API_URL")
            .unwrap_or_else(|| "https://goweather.xyz".to_string())
            .trim_end_matches('/')
            .to_string();
        url::Url::parse(&weather_api_url)
            .with_context(|| format!("WEATHER_API_URL is not a valid URL: {}", weather_api_url))?;

        let server_host = var("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string());

        let server_port = var("SERVER_PORT")
            .and_then(|s| s.trim().parse::<u16>().ok())
            .unwrap_or(3000);

        let cors_origins = parse_cors_origins(&var("CORS_ALLOWED_ORIGINS").unwrap_or_else(|| "*".to_string()))?;

        Ok(Config {
            environment,
            service_name,
            server_host,
            server_port,
            jwks_url,
            issuer,
            audience,
            jwt_algorithms,
            jwt_leeway_secs: number("JWT_LEEWAY_SECS", 60),
            jwks_cache_ttl_secs: number("KEYCLOAK_JWKS_CACHE_SECONDS", 3600),
            jwks_min_refresh_interval_secs: number("JWKS_MIN_REFRESH_INTERVAL_SECS", 10),
            weather_api_url,
            http_connect_timeout_secs: number("HTTP_CONNECT_TIMEOUT_SECS", 10),
            http_request_timeout_secs: number("HTTP_REQUEST_TIMEOUT_SECS", 10),
            cors_origins,
        })
    }

    /// Get bind address for server
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

fn parse_algorithms(raw: &str) -> anyhow::Result<Vec<Algorithm>> {
    let algorithms = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|name| {
            Algorithm::from_str(name)
                .map_err(|_| anyhow::anyhow!("Unsupported JWT algorithm in JWT_ALGORITHMS: {}", name))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    if algorithms.is_empty() {
        anyhow::bail!("JWT_ALGORITHMS must name at least one algorithm");
    }
    Ok(algorithms)
}

fn parse_cors_origins(raw: &str) -> anyhow::Result<CorsOrigins> {
    if raw.trim() == "*" {
        return Ok(CorsOrigins::Any);
    }

    let origins = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|origin| {
            HeaderValue::from_str(origin)
                .with_context(|| format!("Invalid origin in CORS_ALLOWED_ORIGINS: {}", origin))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(CorsOrigins::List(origins))
}
