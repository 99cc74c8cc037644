//! # HTTP Request Handlers
//!
//! ## Submodules
//! - `health`: Health check endpoint (for monitoring)
//! - `auth`: WebAuthn ceremony endpoints and logout
//! - `users`: Profile of the authenticated user
//!
//! ## Handler Pattern
//! Handlers only decode the request (base64 username from the path, raw JSON
//! body), call into the `webauthn` flows and wrap the result in JSON. Errors
//! become HTTP responses through `AppError`'s `IntoResponse`.

pub mod auth;
pub mod health;
pub mod users;
