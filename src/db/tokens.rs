//! # Bearer Token Operations
//!
//! Issuing, validating and revoking the opaque tokens handed out after a
//! successful passkey login.

use crate::db::models::{AuthToken, UserRecord};
use crate::error::{AppError, AppResult};
use chrono::Utc;
use sqlx::SqlitePool;

/// Issue a new bearer token for an already-authenticated user
pub async fn issue_token(
    pool: &SqlitePool,
    user: &UserRecord,
    ttl: chrono::Duration,
) -> AppResult<String> {
    let token = AuthToken::new(user.id.clone(), ttl);

    sqlx::query(
        "INSERT INTO auth_tokens (token, user_id, created_at, expires_at)
         VALUES (?, ?, ?, ?)",
    )
    .bind(&token.token)
    .bind(&token.user_id)
    .bind(&token.created_at)
    .bind(&token.expires_at)
    .execute(pool)
    .await?;

    tracing::debug!(user_id = %user.id, "Issued auth token");

    Ok(token.token)
}

/// Look up a token that still authenticates its user
///
/// Unknown and expired tokens are both `Unauthorized`.
pub async fn find_valid(pool: &SqlitePool, token: &str) -> AppResult<AuthToken> {
    let stored = sqlx::query_as::<_, AuthToken>(
        "SELECT token, user_id, created_at, expires_at FROM auth_tokens WHERE token = ?",
    )
    .bind(token)
    .fetch_one(pool)
    .await
    .map_err(|e| match e {
        sqlx::Error::RowNotFound => AppError::Unauthorized("Invalid token".to_string()),
        _ => AppError::PersistenceFailed(e),
    })?;

    if stored.is_expired(Utc::now())? {
        return Err(AppError::Unauthorized("Token expired".to_string()));
    }

    Ok(stored)
}

pub async fn revoke(pool: &SqlitePool, token: &str) -> AppResult<()> {
    sqlx::query("DELETE FROM auth_tokens WHERE token = ?")
        .bind(token)
        .execute(pool)
        .await?;

    Ok(())
}

/// Delete every expired token, returning how many were removed
pub async fn cleanup_expired(pool: &SqlitePool) -> AppResult<u64> {
    let now = Utc::now().to_rfc3339();

    let result = sqlx::query("DELETE FROM auth_tokens WHERE expires_at < ?")
        .bind(&now)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}
