//! Airwatch Server
//!
//! Run with: cargo run
//!
//! Settings are read from the environment (and a `.env` file if present);
//! see [`airwatch::config`] for the full list. RUST_LOG sets the log level
//! (default: info).

use airwatch::api::run_server;
use airwatch::config::AppConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "airwatch=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;

    tracing::info!("Airwatch configuration:");
    tracing::info!("  Host: {}:{}", config.host, config.port);
    tracing::info!(
        "  Location: {}, {} ({})",
        config.location.lat,
        config.location.lon,
        config.timezone
    );
    tracing::info!("  Air quality API: {}", config.openweather_base_url);
    match &config.email {
        Some(email) => tracing::info!("  Email: {} via {}", email.from, email.api_url),
        None => tracing::info!("  Email: DISABLED (no EMAIL_API_KEY)"),
    }
    if let Some(path) = &config.rules_file {
        tracing::info!("  Rules file: {}", path.display());
    }

    run_server(config).await
}
