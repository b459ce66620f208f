use anyhow::Result;
use portal_api::{web, AppState};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting portal API service");

    // Load configuration from environment
    let config = portal_api::config::Config::load()?;
    tracing::info!(
        environment = ?config.environment,
        service_name = %config.service_name,
        jwks_url = %config.jwks_url,
        "Configuration loaded"
    );

    let state = Arc::new(AppState::from_config(config.clone())?);
    let jwt_validator = state.jwt_validator.clone();

    // Warm the JWKS cache; failure is not fatal, /readyz reports it and the
    // first authenticated request retries
    match jwt_validator.jwks().prefetch().await {
        Ok(key_count) => tracing::info!(key_count, "JWKS prefetched - readiness check will pass"),
        Err(e) => tracing::warn!(error = %e, "Failed to prefetch JWKS at startup (will retry on first token)"),
    }

    let app = web::create_router(state, jwt_validator);

    // Bind and serve
    let bind_address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("Portal API listening on {}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
