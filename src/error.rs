//! # Error Handling
//!
//! This module defines the closed set of errors the service can produce and
//! how each one turns into an HTTP response.
//!
//! Every failure is terminal for the request: nothing in here retries. A
//! client that hits a ceremony error starts over with a fresh begin call.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application-wide error type
///
/// Each variant is one kind of failure, and each kind maps to exactly one
/// HTTP status (see [`AppError::status_code`]). Only infrastructure faults
/// are 5xx; everything a client can cause is 4xx.
#[derive(Error, Debug)]
pub enum AppError {
    /// Unknown user, or a user without a registered passkey (404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// The record store refused to create a new user, e.g. because a
    /// concurrent request created the same username first (409)
    #[error("Could not create user: {0}")]
    CreationFailed(String),

    /// A finish call arrived with no matching begin: never begun, already
    /// consumed, expired, or overwritten by a newer begin (400)
    #[error("No pending ceremony for this user")]
    NoPendingCeremony,

    /// The ceremony engine rejected the attestation or assertion (400)
    #[error("Verification failed: {0}")]
    VerificationFailed(String),

    /// Malformed client input: bad base64 path segment, invalid JSON body,
    /// or a credential response the engine cannot parse (400)
    #[error("Decode error: {0}")]
    DecodeFailed(String),

    /// Missing, unknown or expired bearer token (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Reading from or writing to the record store failed (500)
    ///
    /// `#[from]` lets `?` turn any `sqlx::Error` into this variant.
    #[error("Persistence error: {0}")]
    PersistenceFailed(#[from] sqlx::Error),

    /// The ceremony engine failed to produce a challenge (500)
    #[error("Ceremony engine error: {0}")]
    Ceremony(String),

    /// Serializing or deserializing server-side state failed (500)
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AppError {
    /// The HTTP status this error is reported with
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::CreationFailed(_) => StatusCode::CONFLICT,
            AppError::NoPendingCeremony
            | AppError::VerificationFailed(_)
            | AppError::DecodeFailed(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::PersistenceFailed(_)
            | AppError::Ceremony(_)
            | AppError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Convert AppError into an HTTP response
///
/// Server-side failures are logged in full and answered with a generic
/// message; client-side failures carry their own.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let error_message = match &self {
            AppError::PersistenceFailed(e) => {
                tracing::error!("Persistence error: {:?}", e);
                "Persistence error".to_string()
            }
            AppError::Ceremony(e) => {
                tracing::error!("Ceremony engine error: {}", e);
                "Could not start WebAuthn ceremony".to_string()
            }
            AppError::Serialization(e) => {
                tracing::error!("Serialization error: {:?}", e);
                "Serialization error".to_string()
            }
            AppError::VerificationFailed(reason) => {
                tracing::warn!(%reason, "WebAuthn verification failed");
                "Failed to verify credentials".to_string()
            }
            _ => self.to_string(),
        };

        // Format: { "error": "error message here" }
        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Convenience alias: `AppResult<User>` instead of `Result<User, AppError>`
pub type AppResult<T> = Result<T, AppError>;
