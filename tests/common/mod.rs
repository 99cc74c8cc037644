#![allow(dead_code)]

use std::sync::Arc;

use base64::prelude::*;
use serde_json::{json, Value};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use webauthn_bridge::config::Config;
use webauthn_bridge::db;
use webauthn_bridge::error::{AppError, AppResult};
use webauthn_bridge::state::AppState;
use webauthn_bridge::webauthn::engine::{CeremonyEngine, PasskeyEngine};
use webauthn_bridge::webauthn::types::{CeremonyUser, Challenge, CredentialRecord};

/// Ceremony engine with the same begin/finish contract as the real one, but
/// where "signing" is a string a test can produce or forge.
///
/// A registration response echoes the challenge; a login response must
/// carry `signed:<challenge>` as its signature.
pub struct FakeEngine;

impl FakeEngine {
    fn challenge_from(state: &[u8]) -> AppResult<String> {
        let state: Value = serde_json::from_slice(state)?;
        state["challenge"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| AppError::Ceremony("state without challenge".to_string()))
    }

    fn signed_challenge(response: &Value) -> AppResult<&str> {
        response["response"]["challenge"]
            .as_str()
            .ok_or_else(|| AppError::DecodeFailed("response without challenge".to_string()))
    }
}

impl CeremonyEngine for FakeEngine {
    fn begin_registration(
        &self,
        user: &CeremonyUser<'_>,
        exclude: &[CredentialRecord],
    ) -> AppResult<Challenge> {
        let challenge = uuid::Uuid::new_v4().to_string();
        let exclude: Vec<Value> = exclude
            .iter()
            .map(|credential| json!({ "type": "public-key", "id": credential.id }))
            .collect();

        Ok(Challenge {
            options: json!({
                "publicKey": {
                    "challenge": challenge,
                    "user": {
                        "id": BASE64_URL_SAFE_NO_PAD.encode(user.handle),
                        "name": user.name,
                        "displayName": user.display_name,
                    },
                    "excludeCredentials": exclude,
                }
            }),
            state: serde_json::to_vec(&json!({ "challenge": challenge }))?,
        })
    }

    fn finish_registration(&self, response: &Value, state: &[u8]) -> AppResult<CredentialRecord> {
        let expected = Self::challenge_from(state)?;
        if Self::signed_challenge(response)? != expected {
            return Err(AppError::VerificationFailed("challenge mismatch".to_string()));
        }

        let id = response["id"]
            .as_str()
            .ok_or_else(|| AppError::DecodeFailed("response without id".to_string()))?;

        Ok(CredentialRecord {
            id: id.to_string(),
            passkey: json!({ "counter": 0 }),
        })
    }

    fn begin_login(&self, credentials: &[CredentialRecord]) -> AppResult<Challenge> {
        if credentials.is_empty() {
            return Err(AppError::Ceremony("no credentials".to_string()));
        }

        let challenge = uuid::Uuid::new_v4().to_string();
        let allow: Vec<Value> = credentials
            .iter()
            .map(|credential| json!({ "type": "public-key", "id": credential.id }))
            .collect();

        Ok(Challenge {
            options: json!({
                "publicKey": {
                    "challenge": challenge,
                    "allowCredentials": allow,
                }
            }),
            state: serde_json::to_vec(&json!({ "challenge": challenge }))?,
        })
    }

    fn finish_login(
        &self,
        response: &Value,
        state: &[u8],
        credentials: &[CredentialRecord],
    ) -> AppResult<Option<CredentialRecord>> {
        let expected = Self::challenge_from(state)?;
        let signature = response["response"]["signature"].as_str().unwrap_or_default();
        if Self::signed_challenge(response)? != expected
            || signature != format!("signed:{}", expected)
        {
            return Err(AppError::VerificationFailed("bad signature".to_string()));
        }

        let id = response["id"].as_str().unwrap_or_default();
        let credential = credentials
            .iter()
            .find(|credential| credential.id == id)
            .ok_or_else(|| AppError::VerificationFailed("unknown credential".to_string()))?;

        let counter = credential.passkey["counter"].as_u64().unwrap_or(0);
        Ok(Some(CredentialRecord {
            id: credential.id.clone(),
            passkey: json!({ "counter": counter + 1 }),
        }))
    }
}

/// Single-connection in-memory database, so every query sees the same data
pub async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    db::migrate(&pool).await.unwrap();
    pool
}

pub async fn test_state() -> AppState {
    AppState::with_engine(test_pool().await, Arc::new(FakeEngine), &Config::default())
}

/// State backed by the real webauthn-rs engine, for paths that never need
/// an authenticator to answer
pub async fn passkey_state() -> AppState {
    let config = Config::default();
    let engine = PasskeyEngine::new(&config).unwrap();
    AppState::with_engine(test_pool().await, Arc::new(engine), &config)
}

pub async fn count_users(pool: &SqlitePool) -> i64 {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await
        .unwrap();
    count
}

pub async fn count_tokens(pool: &SqlitePool, user_id: &str) -> i64 {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM auth_tokens WHERE user_id = ?")
        .bind(user_id)
        .fetch_one(pool)
        .await
        .unwrap();
    count
}

pub fn challenge_of(options: &Value) -> String {
    options["publicKey"]["challenge"]
        .as_str()
        .expect("options carry a challenge")
        .to_string()
}

/// What a browser would send back from `navigator.credentials.create()`
pub fn attestation(options: &Value, credential_id: &str) -> Value {
    json!({
        "id": credential_id,
        "response": { "challenge": challenge_of(options) },
    })
}

/// What a browser would send back from `navigator.credentials.get()`
pub fn assertion(options: &Value, credential_id: &str) -> Value {
    let challenge = challenge_of(options);
    json!({
        "id": credential_id,
        "response": {
            "challenge": challenge,
            "signature": format!("signed:{}", challenge),
        },
    })
}

pub fn forged_assertion(options: &Value, credential_id: &str) -> Value {
    json!({
        "id": credential_id,
        "response": {
            "challenge": challenge_of(options),
            "signature": "forged",
        },
    })
}
