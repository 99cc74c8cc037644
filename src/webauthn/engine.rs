//! # Ceremony Engine
//!
//! The cryptographic half of WebAuthn: producing challenges and verifying
//! attestations and assertions. The flows only talk to it through
//! [`CeremonyEngine`], so they never see webauthn-rs types.
//!
//! [`PasskeyEngine`] is the production implementation. It is built once at
//! startup from the relying-party configuration and shared read-only.

use base64::prelude::*;
use serde_json::Value;
use webauthn_rs::prelude::*;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::webauthn::types::{CeremonyUser, Challenge, CredentialRecord};

/// The four ceremony operations the flows need
///
/// Implementations must be cheap to share (`Arc<dyn CeremonyEngine>`) and
/// must not hold per-ceremony state themselves: everything a finish call
/// needs travels in [`Challenge::state`].
pub trait CeremonyEngine: Send + Sync {
    /// Produce a registration challenge for `user`
    ///
    /// `exclude` lists credentials the user already has, so the same
    /// authenticator is not registered twice. Entries the engine cannot
    /// read are skipped.
    ///
    /// The user handle an implementation sends to the authenticator may be
    /// derived from `user.handle` rather than be all of it: [`PasskeyEngine`]
    /// sends the first 16 bytes as a UUID. Callers key ceremonies by the
    /// full stored handle either way.
    fn begin_registration(
        &self,
        user: &CeremonyUser<'_>,
        exclude: &[CredentialRecord],
    ) -> AppResult<Challenge>;

    /// Verify a client attestation against the state from
    /// [`begin_registration`](Self::begin_registration)
    fn finish_registration(&self, response: &Value, state: &[u8]) -> AppResult<CredentialRecord>;

    /// Produce a login challenge restricted to `credentials`
    ///
    /// Fails with `NotFound` when none of them is readable.
    fn begin_login(&self, credentials: &[CredentialRecord]) -> AppResult<Challenge>;

    /// Verify a client assertion against the state from
    /// [`begin_login`](Self::begin_login)
    ///
    /// Returns the updated credential when verification changed it
    /// (signature counter, backup state), `None` when nothing needs saving.
    fn finish_login(
        &self,
        response: &Value,
        state: &[u8],
        credentials: &[CredentialRecord],
    ) -> AppResult<Option<CredentialRecord>>;
}

/// [`CeremonyEngine`] backed by webauthn-rs passkeys
pub struct PasskeyEngine {
    webauthn: Webauthn,
}

impl PasskeyEngine {
    /// Configure WebAuthn with the relying party information
    ///
    /// The first configured origin is the primary one; every other origin is
    /// appended to the allow-list (e.g. a frontend dev server).
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let origins = config.rp_origin_urls()?;
        let (primary, extra) = origins
            .split_first()
            .ok_or_else(|| anyhow::anyhow!("at least one RP origin is required"))?;

        let mut builder = WebauthnBuilder::new(&config.rp_id, primary)?.rp_name(&config.rp_name);
        for origin in extra {
            builder = builder.append_allowed_origin(origin);
        }

        Ok(Self {
            webauthn: builder.build()?,
        })
    }
}

impl CeremonyEngine for PasskeyEngine {
    fn begin_registration(
        &self,
        user: &CeremonyUser<'_>,
        exclude: &[CredentialRecord],
    ) -> AppResult<Challenge> {
        let user_uuid = handle_uuid(user.handle)?;

        let exclude: Vec<CredentialID> = readable_passkeys(exclude)
            .iter()
            .map(|passkey| passkey.cred_id().clone())
            .collect();
        let exclude = if exclude.is_empty() { None } else { Some(exclude) };

        let (ccr, reg_state) = self
            .webauthn
            .start_passkey_registration(user_uuid, user.name, user.display_name, exclude)
            .map_err(|e| AppError::Ceremony(e.to_string()))?;

        Ok(Challenge {
            options: serde_json::to_value(&ccr)?,
            state: serde_json::to_vec(&reg_state)?,
        })
    }

    fn finish_registration(&self, response: &Value, state: &[u8]) -> AppResult<CredentialRecord> {
        let reg_state: PasskeyRegistration = serde_json::from_slice(state)?;

        let reg_credential: RegisterPublicKeyCredential = serde_json::from_value(response.clone())
            .map_err(|e| AppError::DecodeFailed(format!("attestation response: {}", e)))?;

        let passkey = self
            .webauthn
            .finish_passkey_registration(&reg_credential, &reg_state)
            .map_err(|e| AppError::VerificationFailed(e.to_string()))?;

        to_record(&passkey)
    }

    fn begin_login(&self, credentials: &[CredentialRecord]) -> AppResult<Challenge> {
        let passkeys = readable_passkeys(credentials);
        if passkeys.is_empty() {
            return Err(AppError::NotFound("No passkey registered".to_string()));
        }

        let (rcr, auth_state) = self
            .webauthn
            .start_passkey_authentication(&passkeys)
            .map_err(|e| AppError::Ceremony(e.to_string()))?;

        Ok(Challenge {
            options: serde_json::to_value(&rcr)?,
            state: serde_json::to_vec(&auth_state)?,
        })
    }

    fn finish_login(
        &self,
        response: &Value,
        state: &[u8],
        credentials: &[CredentialRecord],
    ) -> AppResult<Option<CredentialRecord>> {
        let auth_state: PasskeyAuthentication = serde_json::from_slice(state)?;

        let auth_credential: PublicKeyCredential = serde_json::from_value(response.clone())
            .map_err(|e| AppError::DecodeFailed(format!("assertion response: {}", e)))?;

        let auth_result = self
            .webauthn
            .finish_passkey_authentication(&auth_credential, &auth_state)
            .map_err(|e| AppError::VerificationFailed(e.to_string()))?;

        for mut passkey in readable_passkeys(credentials) {
            if passkey.update_credential(&auth_result) == Some(true) {
                return Ok(Some(to_record(&passkey)?));
            }
        }

        Ok(None)
    }
}

/// webauthn-rs identifies users by a UUID; use the first 16 bytes of the
/// random handle so the UUID is as unguessable as the handle itself.
fn handle_uuid(handle: &[u8]) -> AppResult<Uuid> {
    let prefix = handle.get(..16).ok_or_else(|| {
        AppError::DecodeFailed(format!(
            "WebAuthn handle is {} bytes, expected at least 16",
            handle.len()
        ))
    })?;

    Uuid::from_slice(prefix).map_err(|e| AppError::DecodeFailed(e.to_string()))
}

fn to_record(passkey: &Passkey) -> AppResult<CredentialRecord> {
    Ok(CredentialRecord {
        id: BASE64_URL_SAFE_NO_PAD.encode(passkey.cred_id().as_slice()),
        passkey: serde_json::to_value(passkey)?,
    })
}

/// Stored credentials that parse as webauthn-rs passkeys
///
/// An unreadable entry counts as absent, the same as an unreadable slot in
/// the codec, so it can never block a ceremony start or re-registration.
fn readable_passkeys(credentials: &[CredentialRecord]) -> Vec<Passkey> {
    credentials
        .iter()
        .filter_map(|credential| {
            match serde_json::from_value::<Passkey>(credential.passkey.clone()) {
                Ok(passkey) => Some(passkey),
                Err(e) => {
                    tracing::warn!(
                        credential_id = %credential.id,
                        "Ignoring unreadable stored passkey: {}",
                        e
                    );
                    None
                }
            }
        })
        .collect()
}
