//! # Identity Resolver
//!
//! Maps an external username to a user record and makes sure the record has
//! a WebAuthn user handle before any ceremony touches it.
//!
//! Handle generation lives here rather than in the flows because either flow
//! can be the first to see a user, and both need the handle before calling
//! the ceremony engine.

use base64::prelude::*;
use sqlx::SqlitePool;

use crate::db::models::{random_bytes, UserRecord};
use crate::db::users::{self, UserField};
use crate::error::{AppError, AppResult};

/// Size of a WebAuthn user handle in bytes (the maximum WebAuthn permits)
pub const HANDLE_LEN: usize = 64;

/// Look up an existing user; unknown usernames are `NotFound`
pub async fn resolve(pool: &SqlitePool, username: &str) -> AppResult<UserRecord> {
    let user = users::find_by_username(pool, username).await?;
    ensure_handle(pool, user).await
}

/// Look up a user, creating it on first sight
///
/// The new record gets a random placeholder secret and empty WebAuthn
/// fields. If a concurrent request creates the same username between our
/// lookup and insert, this fails with `CreationFailed`.
pub async fn resolve_or_create(pool: &SqlitePool, username: &str) -> AppResult<UserRecord> {
    match users::find_by_username(pool, username).await {
        Ok(user) => ensure_handle(pool, user).await,
        Err(AppError::NotFound(_)) => {
            let user_id = users::create_user(pool, username).await?;
            tracing::info!(%user_id, "Created user '{}'", username);
            resolve(pool, username).await
        }
        Err(e) => Err(e),
    }
}

/// Give `user` a WebAuthn handle if it doesn't have one yet
///
/// The handle is 64 bytes from the OS CSPRNG, never derived from the
/// username or ID. The write only succeeds on an empty slot, so two racing
/// calls agree on whichever handle landed first.
pub async fn ensure_handle(pool: &SqlitePool, user: UserRecord) -> AppResult<UserRecord> {
    if user.has_handle() {
        return Ok(user);
    }

    let handle = BASE64_STANDARD.encode(random_bytes(HANDLE_LEN));

    if users::claim_user_field(pool, &user.id, UserField::WebAuthnHandle, &handle).await? {
        tracing::debug!(user_id = %user.id, "Generated WebAuthn handle");
        return Ok(UserRecord {
            webauthn_id_b64: handle,
            ..user
        });
    }

    // Someone else wrote the handle first
    let stored = users::find_by_id(pool, &user.id).await?;
    if !stored.has_handle() {
        return Err(AppError::NotFound(format!(
            "User with id '{}' disappeared",
            user.id
        )));
    }

    Ok(stored)
}
