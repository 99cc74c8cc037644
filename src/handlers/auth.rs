use crate::db::tokens;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthenticatedUser;
use crate::state::AppState;
use crate::webauthn::types::LoginResponse;
use crate::webauthn::{authentication, registration};
use axum::{
    body::Bytes,
    extract::{Path, State},
    Extension, Json,
};
use base64::prelude::*;
use serde_json::{json, Value};

// Registration endpoints

pub async fn begin_registration(
    State(state): State<AppState>,
    Path(username_b64): Path<String>,
) -> AppResult<Json<Value>> {
    let username = decode_username(&username_b64)?;
    let options = registration::begin_registration(&state, &username).await?;

    Ok(Json(options))
}

pub async fn finish_registration(
    State(state): State<AppState>,
    Path(username_b64): Path<String>,
    body: Bytes,
) -> AppResult<Json<Value>> {
    let username = decode_username(&username_b64)?;
    let response = parse_body(&body)?;
    registration::finish_registration(&state, &username, &response).await?;

    Ok(Json(json!({ "status": "success" })))
}

// Login endpoints

pub async fn begin_login(
    State(state): State<AppState>,
    Path(username_b64): Path<String>,
) -> AppResult<Json<Value>> {
    let username = decode_username(&username_b64)?;
    let options = authentication::begin_login(&state, &username).await?;

    Ok(Json(options))
}

pub async fn finish_login(
    State(state): State<AppState>,
    Path(username_b64): Path<String>,
    body: Bytes,
) -> AppResult<Json<LoginResponse>> {
    let username = decode_username(&username_b64)?;
    let response = parse_body(&body)?;
    let login = authentication::finish_login(&state, &username, &response).await?;

    Ok(Json(login))
}

pub async fn logout(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
) -> AppResult<Json<Value>> {
    tokens::revoke(&state.db, &auth.token).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Logged out successfully"
    })))
}

/// Usernames travel as standard base64 so any character survives the URL
fn decode_username(username_b64: &str) -> AppResult<String> {
    let bytes = BASE64_STANDARD
        .decode(username_b64.as_bytes())
        .map_err(|_| AppError::DecodeFailed("Could not decode user from path".to_string()))?;

    let username = String::from_utf8(bytes)
        .map_err(|_| AppError::DecodeFailed("Username is not valid UTF-8".to_string()))?;

    if username.trim().is_empty() {
        return Err(AppError::DecodeFailed("Username is empty".to_string()));
    }

    Ok(username)
}

fn parse_body(body: &[u8]) -> AppResult<Value> {
    serde_json::from_slice(body)
        .map_err(|e| AppError::DecodeFailed(format!("Request body is not valid JSON: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_standard_base64_usernames() {
        assert_eq!(decode_username("YWxpY2U=").unwrap(), "alice");
        // "ä+ö/ü" exercises non-ASCII bytes
        let encoded = BASE64_STANDARD.encode("ä+ö/ü");
        assert_eq!(decode_username(&encoded).unwrap(), "ä+ö/ü");
    }

    #[test]
    fn rejects_bad_usernames() {
        assert!(matches!(decode_username("%%%"), Err(AppError::DecodeFailed(_))));
        assert!(matches!(decode_username(""), Err(AppError::DecodeFailed(_))));
        // 0xff 0xfe is not UTF-8
        assert!(matches!(decode_username("//4="), Err(AppError::DecodeFailed(_))));
    }

    #[test]
    fn body_must_be_json() {
        assert!(parse_body(br#"{"id":"x"}"#).is_ok());
        assert!(matches!(parse_body(b"not json"), Err(AppError::DecodeFailed(_))));
    }
}
