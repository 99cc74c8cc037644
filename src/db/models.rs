//! # Database Models
//!
//! Rows of the `users` and `auth_tokens` tables, plus the small helpers used
//! to build new rows (IDs, timestamps, random secrets).

use base64::prelude::*;
use chrono::{DateTime, Utc};
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::webauthn::codec::{self, StoredCredential};

/// One user of the relying party
///
/// The placeholder secret column is never selected into this struct; it only
/// exists to satisfy the record store's own credential requirement.
///
/// Timestamps are RFC3339 strings because SQLite stores them as text.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserRecord {
    /// Unique identifier (UUID v4), immutable
    pub id: String,

    /// Unique external handle, the only lookup key clients use
    pub username: String,

    /// Display name; empty means "use the username"
    pub name: String,

    /// WebAuthn user handle: 64 random bytes, standard base64.
    /// Empty until first generated, never changed afterwards.
    pub webauthn_id_b64: String,

    /// Single-slot encoded credential, empty until a registration succeeds
    pub webauthn_credentials: String,

    pub created_at: String,
    pub updated_at: String,
}

impl UserRecord {
    /// Human-readable name, falling back to the username when unset
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.username
        } else {
            &self.name
        }
    }

    pub fn has_handle(&self) -> bool {
        !self.webauthn_id_b64.is_empty()
    }

    /// Raw bytes of the WebAuthn user handle
    pub fn handle_bytes(&self) -> AppResult<Vec<u8>> {
        if !self.has_handle() {
            return Err(AppError::DecodeFailed(format!(
                "user '{}' has no WebAuthn handle yet",
                self.username
            )));
        }
        BASE64_STANDARD
            .decode(self.webauthn_id_b64.as_bytes())
            .map_err(|e| AppError::DecodeFailed(format!("stored WebAuthn handle: {}", e)))
    }

    /// Decode the stored credential slot
    ///
    /// Never fails: an empty or unreadable slot is [`StoredCredential::Empty`].
    pub fn credential(&self) -> StoredCredential {
        codec::decode(&self.webauthn_credentials)
    }
}

/// A row to be inserted into `users`
#[derive(Debug, Clone)]
pub struct NewUser {
    pub id: String,
    pub username: String,
    pub name: String,
    pub placeholder_secret: String,
    pub created_at: String,
    pub updated_at: String,
}

impl NewUser {
    /// Create a new user row with a generated ID, timestamps and a random
    /// 32-byte placeholder secret
    ///
    /// The handle and credential slots start out empty.
    pub fn new(username: String) -> Self {
        let now = Utc::now().to_rfc3339();

        Self {
            id: Uuid::new_v4().to_string(),
            username,
            name: String::new(),
            placeholder_secret: BASE64_STANDARD.encode(random_bytes(32)),
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

/// Bearer token issued after a successful login
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AuthToken {
    /// 32 random bytes, base64url without padding
    pub token: String,

    pub user_id: String,

    pub created_at: String,

    /// After this instant the token no longer authenticates anything
    pub expires_at: String,
}

impl AuthToken {
    pub fn new(user_id: String, ttl: chrono::Duration) -> Self {
        let now = Utc::now();

        Self {
            token: BASE64_URL_SAFE_NO_PAD.encode(random_bytes(32)),
            user_id,
            created_at: now.to_rfc3339(),
            expires_at: (now + ttl).to_rfc3339(),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> AppResult<bool> {
        let expires_at = DateTime::parse_from_rfc3339(&self.expires_at).map_err(|e| {
            AppError::DecodeFailed(format!("invalid token expiration timestamp: {}", e))
        })?;

        Ok(now > expires_at)
    }
}

/// `len` bytes from the operating system's CSPRNG
pub(crate) fn random_bytes(len: usize) -> Vec<u8> {
    let mut buf = vec![0u8; len];
    OsRng.fill_bytes(&mut buf);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, handle: &str) -> UserRecord {
        UserRecord {
            id: "id".to_string(),
            username: "alice".to_string(),
            name: name.to_string(),
            webauthn_id_b64: handle.to_string(),
            webauthn_credentials: String::new(),
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn display_name_defaults_to_username() {
        assert_eq!(record("", "").display_name(), "alice");
        assert_eq!(record("  ", "").display_name(), "alice");
        assert_eq!(record("Alice A.", "").display_name(), "Alice A.");
    }

    #[test]
    fn missing_handle_is_a_decode_error() {
        assert!(matches!(
            record("", "").handle_bytes(),
            Err(AppError::DecodeFailed(_))
        ));
    }

    #[test]
    fn handle_round_trips_through_base64() {
        let raw = random_bytes(64);
        let user = record("", &BASE64_STANDARD.encode(&raw));
        assert_eq!(user.handle_bytes().unwrap(), raw);
    }

    #[test]
    fn new_user_has_secret_but_no_handle() {
        let user = NewUser::new("bob".to_string());
        assert_eq!(BASE64_STANDARD.decode(&user.placeholder_secret).unwrap().len(), 32);
        assert!(Uuid::parse_str(&user.id).is_ok());
    }

    #[test]
    fn token_expiry() {
        let token = AuthToken::new("u".to_string(), chrono::Duration::minutes(5));
        assert!(!token.is_expired(Utc::now()).unwrap());
        assert!(token
            .is_expired(Utc::now() + chrono::Duration::minutes(6))
            .unwrap());
    }
}
