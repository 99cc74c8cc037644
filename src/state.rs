//! # Application State
//!
//! The resources shared by every request handler. Axum clones the state for
//! each request, which is cheap: the pool is a handle and everything else is
//! behind an `Arc`.

use crate::config::Config;
use crate::db;
use crate::webauthn::ceremonies::CeremonyStore;
use crate::webauthn::engine::{CeremonyEngine, PasskeyEngine};
use anyhow::Result;
use sqlx::sqlite::SqlitePool;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Record store connection pool
    pub db: SqlitePool,

    /// Ceremony engine, configured once at startup and read-only afterwards
    pub engine: Arc<dyn CeremonyEngine>,

    /// Pending begin→finish ceremonies, the only shared mutable state
    pub ceremonies: Arc<CeremonyStore>,

    /// Lifetime of bearer tokens issued on login
    pub token_ttl: chrono::Duration,
}

impl AppState {
    /// Initialize application state
    ///
    /// 1. Connects to the SQLite database
    /// 2. Runs database migrations
    /// 3. Builds the WebAuthn engine from the relying party configuration
    ///
    /// # Errors
    /// Fails if the database is unreachable, a migration fails, or the RP
    /// configuration is invalid (e.g., a malformed origin URL).
    pub async fn new(config: &Config) -> Result<Self> {
        let db = SqlitePool::connect(&config.database_url).await?;
        db::migrate(&db).await?;

        let engine = Arc::new(PasskeyEngine::new(config)?);

        Ok(Self::with_engine(db, engine, config))
    }

    /// Assemble state from an existing pool and engine
    pub fn with_engine(db: SqlitePool, engine: Arc<dyn CeremonyEngine>, config: &Config) -> Self {
        AppState {
            db,
            engine,
            ceremonies: Arc::new(CeremonyStore::new(config.ceremony_ttl())),
            token_ttl: config.token_ttl(),
        }
    }
}
