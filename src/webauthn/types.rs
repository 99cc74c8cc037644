//! # WebAuthn API Types
//!
//! Values passed between the HTTP layer, the flows and the ceremony engine.
//!
//! Challenges and client responses travel as raw `serde_json::Value`: the
//! browser produces and consumes them as-is, and only the ceremony engine
//! needs to understand their structure.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::db::models::UserRecord;

/// Credential material produced by a successful registration
///
/// Opaque to everything except the engine that produced it. This is what
/// ends up (encoded) in the user's single credential slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialRecord {
    /// Credential ID, base64url without padding
    pub id: String,

    /// Engine-specific credential data (public key, counter, flags)
    pub passkey: Value,
}

/// Which ceremony a pending session belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CeremonyKind {
    Registration,
    Login,
}

/// The user identity as the ceremony engine sees it
#[derive(Debug, Clone, Copy)]
pub struct CeremonyUser<'a> {
    /// Raw WebAuthn user handle bytes
    pub handle: &'a [u8],
    pub name: &'a str,
    pub display_name: &'a str,
}

/// Output of a begin call
#[derive(Debug, Clone)]
pub struct Challenge {
    /// Options handed to `navigator.credentials.create()` / `.get()`
    pub options: Value,

    /// Server-side state the matching finish call needs
    pub state: Vec<u8>,
}

/// Public view of a user, safe to return to clients
///
/// ## Example JSON
/// ```json
/// {
///   "id": "550e8400-e29b-41d4-a716-446655440000",
///   "username": "alice",
///   "name": "alice",
///   "created_at": "2024-01-15T10:30:00+00:00"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub username: String,
    pub name: String,
    pub created_at: String,
}

impl From<&UserRecord> for UserProfile {
    fn from(user: &UserRecord) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            name: user.display_name().to_string(),
            created_at: user.created_at.clone(),
        }
    }
}

/// Successful login: the bearer token and who it belongs to
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserProfile,
}
