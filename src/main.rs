//! Entrypoint: serves the API or gateway router on `PORT`.

use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{EnvFilter, fmt};

use session_relay::config::{Config, RelayMode};
use session_relay::{AppState, create_router};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env for local runs
    let _ = dotenvy::dotenv();

    let config = Config::from_env()?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if config.json_logs {
        fmt().json().with_env_filter(filter).init();
    } else {
        fmt().with_env_filter(filter).init();
    }

    if config.auth_service().is_none() {
        tracing::warn!("AUTH_SERVICE_URL or AUTH_SERVICE_ANON_KEY unset, auth endpoints will answer ENV_ERROR");
    }

    let http_client = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .timeout(Duration::from_secs(30))
        .build()?;

    let mode = config.mode;
    let addr = format!("0.0.0.0:{}", config.port);
    let app = create_router(Arc::new(AppState::new(config, http_client)));

    match mode {
        RelayMode::Api => tracing::info!("Starting API server on {}", addr),
        RelayMode::Gateway => tracing::info!("Starting gateway on {}", addr),
    }
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
