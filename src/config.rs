//! # Configuration Management
//!
//! This module handles loading configuration from environment variables.
//! Configuration comes from the environment (12-factor style), with a `.env`
//! file picked up for local development.
//!
//! ## Environment Variables
//! - `HOST`: Server bind address (default: 127.0.0.1)
//! - `PORT`: Server port (default: 8090)
//! - `DATABASE_URL`: SQLite database connection string
//! - `RP_ID`: WebAuthn Relying Party ID (usually your domain)
//! - `RP_ORIGINS`: Comma-separated list of allowed origins (full URLs)
//! - `RP_NAME`: Human-readable name for your service
//! - `CEREMONY_TTL_SECS`: How long a begun ceremony may wait for its finish call
//! - `TOKEN_TTL_HOURS`: Lifetime of issued bearer tokens
//! - `CLEANUP_INTERVAL_SECS`: Period of the expired-state sweeper
//! - `STATIC_DIR`: Directory served for every non-API path

use anyhow::{bail, Context, Result};
use std::env;
use webauthn_rs::prelude::Url;

/// Application configuration
///
/// Constructed once at startup and never mutated afterwards. Request handlers
/// only ever see the values baked into `AppState` from it.
///
/// ## WebAuthn Terminology
/// - **RP (Relying Party)**: This service, which relies on the authenticator
/// - **RP ID**: Your domain name (e.g., "example.com" or "localhost")
/// - **RP Origins**: Full URLs the browser may run the ceremony from
///   (e.g., "https://example.com", or a dev server on another port)
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host/IP address to bind to
    pub host: String,

    /// Server port number
    pub port: u16,

    /// SQLite database connection URL
    /// Format: "sqlite:filename.db?mode=rwc" (read, write, create if missing)
    pub database_url: String,

    /// WebAuthn Relying Party ID
    /// Must match the domain your app is served from, without scheme or port
    pub rp_id: String,

    /// Allowed WebAuthn origins
    /// The first entry is the primary origin; the rest are accepted as well
    pub rp_origins: Vec<String>,

    /// Human-readable name shown to users during passkey creation
    pub rp_name: String,

    /// Seconds a pending ceremony stays valid after its begin call
    pub ceremony_ttl_secs: i64,

    /// Hours an issued bearer token stays valid
    pub token_ttl_hours: i64,

    /// Seconds between two runs of the cleanup task
    pub cleanup_interval_secs: u64,

    /// Directory with the frontend's static files
    pub static_dir: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: "127.0.0.1".to_string(),
            port: 8090,
            database_url: "sqlite:webauthn.db?mode=rwc".to_string(),
            rp_id: "localhost".to_string(),
            rp_origins: vec![
                "http://localhost:8090".to_string(),
                "http://localhost:5173".to_string(),
            ],
            rp_name: "Passkey Records".to_string(),
            ceremony_ttl_secs: 300,
            token_ttl_hours: 24,
            cleanup_interval_secs: 600,
            static_dir: "pb_public".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Every variable is optional and falls back to the value in
    /// [`Config::default`]. Numeric variables that are present but don't
    /// parse are reported as errors instead of silently ignored.
    ///
    /// ## Example .env file
    /// ```text
    /// HOST=127.0.0.1
    /// PORT=8090
    /// DATABASE_URL=sqlite:webauthn.db?mode=rwc
    /// RP_ID=localhost
    /// RP_ORIGINS=http://localhost:8090,http://localhost:5173
    /// RP_NAME=Passkey Records
    /// ```
    pub fn from_env() -> Result<Self> {
        // dotenvy doesn't error if the file is missing
        dotenvy::dotenv().ok();

        let defaults = Config::default();

        let config = Config {
            host: env::var("HOST").unwrap_or(defaults.host),
            port: parse_var("PORT", defaults.port)?,
            database_url: env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            rp_id: env::var("RP_ID").unwrap_or(defaults.rp_id),
            rp_origins: match env::var("RP_ORIGINS") {
                Ok(raw) => parse_origins(&raw),
                Err(_) => defaults.rp_origins,
            },
            rp_name: env::var("RP_NAME").unwrap_or(defaults.rp_name),
            ceremony_ttl_secs: parse_var("CEREMONY_TTL_SECS", defaults.ceremony_ttl_secs)?,
            token_ttl_hours: parse_var("TOKEN_TTL_HOURS", defaults.token_ttl_hours)?,
            cleanup_interval_secs: parse_var(
                "CLEANUP_INTERVAL_SECS",
                defaults.cleanup_interval_secs,
            )?,
            static_dir: env::var("STATIC_DIR").unwrap_or(defaults.static_dir),
        };

        if config.rp_origins.is_empty() {
            bail!("RP_ORIGINS must name at least one origin");
        }

        Ok(config)
    }

    /// Get the socket address to bind the server to, e.g. "127.0.0.1:8090"
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Parse every configured origin into a URL
    ///
    /// Fails on the first origin that isn't a valid absolute URL.
    pub fn rp_origin_urls(&self) -> Result<Vec<Url>> {
        self.rp_origins
            .iter()
            .map(|origin| {
                Url::parse(origin).with_context(|| format!("invalid RP origin '{}'", origin))
            })
            .collect()
    }

    pub fn ceremony_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.ceremony_ttl_secs)
    }

    pub fn token_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.token_ttl_hours)
    }
}

fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} is not a valid number: '{}'", name, raw)),
        Err(_) => Ok(default),
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(|origin| origin.trim_end_matches('/').to_string())
        .collect()
}
