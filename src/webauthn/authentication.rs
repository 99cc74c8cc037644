//! # Passkey Login Logic
//!
//! Login mirrors registration: begin and finish.
//!
//! ## Login Flow
//! 1. **Begin**: Resolve an existing user → ask the engine for a challenge
//!    limited to the stored credential → park the engine state under the
//!    user's handle
//! 2. **Finish**: Resolve the same user → take the parked state → verify the
//!    assertion → save the updated credential → issue a bearer token
//!
//! Unlike registration, login never creates a user.

use serde_json::Value;

use crate::db::tokens;
use crate::db::users::{self, UserField};
use crate::error::{AppError, AppResult};
use crate::state::AppState;
use crate::webauthn::codec::{self, StoredCredential};
use crate::webauthn::identity;
use crate::webauthn::types::{CeremonyKind, LoginResponse, UserProfile};

/// Start the passkey login process
///
/// ## Returns
/// The `RequestChallengeResponse` JSON for `navigator.credentials.get()`.
///
/// ## Errors
/// - NotFound: unknown user, or no readable passkey stored
/// - PersistenceFailed: the record store is unavailable
/// - Ceremony: the engine could not produce a challenge
pub async fn begin_login(state: &AppState, username: &str) -> AppResult<Value> {
    // Login never creates users
    let user = identity::resolve(&state.db, username).await?;

    let credential = match user.credential() {
        StoredCredential::Present(credential) => credential,
        StoredCredential::Empty => {
            return Err(AppError::NotFound(format!(
                "No passkey registered for user '{}'",
                username
            )))
        }
    };

    let challenge = state.engine.begin_login(&[credential])?;

    state
        .ceremonies
        .put(&user.webauthn_id_b64, CeremonyKind::Login, challenge.state);

    tracing::debug!(user_id = %user.id, "Login challenge issued");

    Ok(challenge.options)
}

/// Finish the passkey login process
///
/// ## Errors
/// - NotFound: unknown user, or no passkey stored
/// - NoPendingCeremony: no login begin for this user, or it was already used/expired
/// - DecodeFailed: the response is not an authentication credential
/// - VerificationFailed: the engine rejected the assertion
/// - PersistenceFailed: saving the credential or the token failed
pub async fn finish_login(
    state: &AppState,
    username: &str,
    response: &Value,
) -> AppResult<LoginResponse> {
    let user = identity::resolve(&state.db, username).await?;

    let session = state
        .ceremonies
        .take(&user.webauthn_id_b64, CeremonyKind::Login)?;

    let credentials = user.credential().into_vec();
    if credentials.is_empty() {
        return Err(AppError::NotFound(format!(
            "No passkey registered for user '{}'",
            username
        )));
    }

    let updated = state
        .engine
        .finish_login(response, &session, &credentials)?;

    // Keep the signature counter current so cloned authenticators show up
    if let Some(credential) = updated {
        users::save_user_field(
            &state.db,
            &user.id,
            UserField::Credential,
            &codec::encode(&credential)?,
        )
        .await?;
    }

    let token = tokens::issue_token(&state.db, &user, state.token_ttl).await?;

    tracing::info!(user_id = %user.id, "Passkey login succeeded");

    Ok(LoginResponse {
        token,
        user: UserProfile::from(&user),
    })
}
