//! # WebAuthn Bridge Server
//!
//! Entry point: logging, configuration, state, background cleanup, HTTP.

use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use webauthn_bridge::config::Config;
use webauthn_bridge::db::tokens;
use webauthn_bridge::state::AppState;

/// 1. Sets up logging (override with RUST_LOG)
/// 2. Loads configuration from environment variables
/// 3. Initializes database and WebAuthn engine
/// 4. Starts a background task that drops expired ceremonies and tokens
/// 5. Builds the router and serves it
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,webauthn_bridge=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    tracing::info!("Configuration loaded: {:?}", config);

    let app_state = AppState::new(&config).await?;
    tracing::info!(
        rp_id = %config.rp_id,
        origins = ?config.rp_origins,
        "Application state initialized"
    );

    // Pending ceremonies and tokens both expire; nothing else removes them
    let cleanup_state = app_state.clone();
    let cleanup_every = Duration::from_secs(config.cleanup_interval_secs.max(1));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(cleanup_every);
        loop {
            interval.tick().await;

            let ceremonies = cleanup_state.ceremonies.sweep();
            match tokens::cleanup_expired(&cleanup_state.db).await {
                Ok(expired_tokens) => {
                    tracing::debug!(ceremonies, expired_tokens, "Expired state cleaned up");
                }
                Err(e) => tracing::error!("Token cleanup failed: {:?}", e),
            }
        }
    });

    let app = webauthn_bridge::router(app_state, &config)?;

    let bind_addr = config.bind_address();
    tracing::info!("Starting server on {}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
