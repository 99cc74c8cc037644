//! # Database Module
//!
//! The record store behind the WebAuthn flows:
//! - `models`: Row types (users, auth tokens)
//! - `users`: Lookup, creation and field writes on user records
//! - `tokens`: Bearer tokens issued after login

pub mod models;
pub mod tokens;
pub mod users;

use sqlx::SqlitePool;

/// Apply the embedded migrations from `./migrations`
///
/// Already-applied migrations are tracked by sqlx and skipped.
pub async fn migrate(pool: &SqlitePool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
