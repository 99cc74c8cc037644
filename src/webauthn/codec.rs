//! Encoding of the single credential slot on a user record.

use crate::error::AppResult;
use crate::webauthn::types::CredentialRecord;

/// Result of decoding a stored credential slot
#[derive(Debug, Clone, PartialEq)]
pub enum StoredCredential {
    Present(CredentialRecord),
    /// Nothing usable stored: never registered, or an unreadable blob
    Empty,
}

impl StoredCredential {
    pub fn is_empty(&self) -> bool {
        matches!(self, StoredCredential::Empty)
    }

    /// The stored credentials as a list, which is what the engine consumes
    pub fn into_vec(self) -> Vec<CredentialRecord> {
        match self {
            StoredCredential::Present(credential) => vec![credential],
            StoredCredential::Empty => Vec::new(),
        }
    }
}

pub fn encode(credential: &CredentialRecord) -> AppResult<String> {
    Ok(serde_json::to_string(credential)?)
}

/// Decode a stored credential slot
///
/// A freshly created user legitimately has nothing stored, so an empty slot
/// is not an error. A malformed blob is treated the same way (with a warning)
/// so it can't block user resolution.
pub fn decode(blob: &str) -> StoredCredential {
    let blob = blob.trim();
    if blob.is_empty() {
        return StoredCredential::Empty;
    }

    match serde_json::from_str::<Option<CredentialRecord>>(blob) {
        Ok(Some(credential)) => StoredCredential::Present(credential),
        Ok(None) => StoredCredential::Empty,
        Err(e) => {
            tracing::warn!("Ignoring unreadable stored credential: {}", e);
            StoredCredential::Empty
        }
    }
}
