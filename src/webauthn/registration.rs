//! # Passkey Registration Logic
//!
//! Registration is a two-step process: begin and finish.
//!
//! ## Registration Flow
//! 1. **Begin**: Resolve (or create) the user → ask the engine for a
//!    challenge → park the engine state under the user's handle
//! 2. **Finish**: Resolve the same user → take the parked state → verify the
//!    attestation → store the credential on the user record
//!
//! A failed finish leaves the user in place with a handle and no
//! credential, so the client can simply begin again.

use serde_json::Value;

use crate::db::users::{self, UserField};
use crate::error::AppResult;
use crate::state::AppState;
use crate::webauthn::codec;
use crate::webauthn::identity;
use crate::webauthn::types::{CeremonyKind, CeremonyUser};

/// Start the passkey registration process
///
/// ## Returns
/// The `CreationChallengeResponse` JSON for `navigator.credentials.create()`:
/// challenge, relying party, user entity and the credentials to exclude.
///
/// ## Errors
/// - CreationFailed: the username was created concurrently
/// - PersistenceFailed: the record store is unavailable
/// - Ceremony: the engine could not produce a challenge
pub async fn begin_registration(state: &AppState, username: &str) -> AppResult<Value> {
    let user = identity::resolve_or_create(&state.db, username).await?;
    let handle = user.handle_bytes()?;

    // Existing credentials are excluded so the same authenticator
    // can't be enrolled twice
    let existing = user.credential().into_vec();

    let challenge = state.engine.begin_registration(
        &CeremonyUser {
            handle: &handle,
            name: &user.username,
            display_name: user.display_name(),
        },
        &existing,
    )?;

    state
        .ceremonies
        .put(&user.webauthn_id_b64, CeremonyKind::Registration, challenge.state);

    tracing::debug!(user_id = %user.id, "Registration challenge issued");

    Ok(challenge.options)
}

/// Finish the passkey registration process
///
/// On success the new credential overwrites whatever was in the user's
/// credential slot.
///
/// ## Errors
/// - NoPendingCeremony: no begin for this user, or it was already used/expired
/// - DecodeFailed: the response is not a registration credential
/// - VerificationFailed: the engine rejected the attestation
/// - PersistenceFailed: storing the credential failed
pub async fn finish_registration(
    state: &AppState,
    username: &str,
    response: &Value,
) -> AppResult<()> {
    let user = identity::resolve_or_create(&state.db, username).await?;

    // One-time use: the pending state is gone from here on, whatever happens
    let session = state
        .ceremonies
        .take(&user.webauthn_id_b64, CeremonyKind::Registration)?;

    let credential = state.engine.finish_registration(response, &session)?;

    users::save_user_field(
        &state.db,
        &user.id,
        UserField::Credential,
        &codec::encode(&credential)?,
    )
    .await?;

    tracing::info!(user_id = %user.id, credential_id = %credential.id, "Passkey registered");

    Ok(())
}
