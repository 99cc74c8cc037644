//! # User Record Operations
//!
//! Lookup, creation and single-field writes on the `users` table. These are
//! the only operations the ceremony code needs from the record store.

use crate::db::models::{NewUser, UserRecord};
use crate::error::{AppError, AppResult};
use chrono::Utc;
use sqlx::SqlitePool;

const USER_COLUMNS: &str =
    "id, username, name, webauthn_id_b64, webauthn_credentials, created_at, updated_at";

/// Writable WebAuthn fields of a user record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserField {
    /// Base64 user handle
    WebAuthnHandle,
    /// Encoded single-slot credential
    Credential,
}

impl UserField {
    fn column(self) -> &'static str {
        match self {
            UserField::WebAuthnHandle => "webauthn_id_b64",
            UserField::Credential => "webauthn_credentials",
        }
    }
}

pub async fn find_by_username(pool: &SqlitePool, username: &str) -> AppResult<UserRecord> {
    let user = sqlx::query_as::<_, UserRecord>(&format!(
        "SELECT {} FROM users WHERE username = ?",
        USER_COLUMNS
    ))
    .bind(username)
    .fetch_one(pool)
    .await
    .map_err(|e| match e {
        sqlx::Error::RowNotFound => AppError::NotFound(format!("User '{}' not found", username)),
        _ => AppError::PersistenceFailed(e),
    })?;

    Ok(user)
}

pub async fn find_by_id(pool: &SqlitePool, user_id: &str) -> AppResult<UserRecord> {
    let user = sqlx::query_as::<_, UserRecord>(&format!(
        "SELECT {} FROM users WHERE id = ?",
        USER_COLUMNS
    ))
    .bind(user_id)
    .fetch_one(pool)
    .await
    .map_err(|e| match e {
        sqlx::Error::RowNotFound => {
            AppError::NotFound(format!("User with id '{}' not found", user_id))
        }
        _ => AppError::PersistenceFailed(e),
    })?;

    Ok(user)
}

/// Insert a fresh user with empty WebAuthn fields
///
/// A unique-constraint violation (the username already exists) is reported
/// as `CreationFailed`; any other database failure as `PersistenceFailed`.
pub async fn create_user(pool: &SqlitePool, username: &str) -> AppResult<String> {
    let user = NewUser::new(username.to_string());

    sqlx::query(
        "INSERT INTO users (id, username, name, placeholder_secret, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&user.id)
    .bind(&user.username)
    .bind(&user.name)
    .bind(&user.placeholder_secret)
    .bind(&user.created_at)
    .bind(&user.updated_at)
    .execute(pool)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(ref db) if db.is_unique_violation() => {
            AppError::CreationFailed(format!("username '{}' is already taken", username))
        }
        _ => AppError::PersistenceFailed(e),
    })?;

    Ok(user.id)
}

/// Overwrite one WebAuthn field of a user
pub async fn save_user_field(
    pool: &SqlitePool,
    user_id: &str,
    field: UserField,
    value: &str,
) -> AppResult<()> {
    let result = sqlx::query(&format!(
        "UPDATE users SET {} = ?, updated_at = ? WHERE id = ?",
        field.column()
    ))
    .bind(value)
    .bind(Utc::now().to_rfc3339())
    .bind(user_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!(
            "User with id '{}' not found",
            user_id
        )));
    }

    Ok(())
}

/// Write one WebAuthn field only if it's still empty
///
/// Returns `true` when this call wrote the value, `false` when another
/// writer got there first (or the user doesn't exist).
pub async fn claim_user_field(
    pool: &SqlitePool,
    user_id: &str,
    field: UserField,
    value: &str,
) -> AppResult<bool> {
    let result = sqlx::query(&format!(
        "UPDATE users SET {col} = ?, updated_at = ? WHERE id = ? AND {col} = ''",
        col = field.column()
    ))
    .bind(value)
    .bind(Utc::now().to_rfc3339())
    .bind(user_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}
