//! # WebAuthn Bridge
//!
//! Passwordless WebAuthn (passkey) registration and login on top of a
//! SQLite user-record store.
//!
//! ## Key Concepts
//! - **Ceremony**: A challenge/response exchange; begin issues the
//!   challenge, finish verifies what the authenticator signed
//! - **User handle**: 64 random bytes identifying the user to the
//!   authenticator, independent of username and record ID
//! - **Bearer token**: Issued after a verified login, authorizes `/api/*`

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod state;
pub mod webauthn;

use crate::config::Config;
use crate::handlers::auth::{begin_login, begin_registration, finish_login, finish_registration, logout};
use crate::handlers::health::health_check;
use crate::handlers::users::get_current_user;
use crate::state::AppState;
use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Build the HTTP application
///
/// ## Routes
/// - `POST /webauthn-begin-registration/{username_b64}`
/// - `POST /webauthn-finish-registration/{username_b64}`
/// - `POST /webauthn-begin-login/{username_b64}`
/// - `POST /webauthn-finish-login/{username_b64}`
/// - `POST /api/auth/logout` (bearer token)
/// - `GET /api/users/me` (bearer token)
/// - `GET /health`
/// - anything else: static files from `config.static_dir`
pub fn router(state: AppState, config: &Config) -> anyhow::Result<Router> {
    // Only the configured RP origins may call the API from a browser
    let origins = config
        .rp_origins
        .iter()
        .map(|origin| HeaderValue::from_str(origin))
        .collect::<Result<Vec<_>, _>>()?;

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    // Routes behind the bearer-token check; route_layer keeps unknown
    // paths on 404 instead of 401
    let protected_routes = Router::new()
        .route("/api/users/me", get(get_current_user))
        .route("/api/auth/logout", post(logout))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_auth,
        ));

    let app = Router::new()
        .route("/health", get(health_check))
        // Registration: begin issues the challenge, finish stores the credential
        .route("/webauthn-begin-registration/{username_b64}", post(begin_registration))
        .route("/webauthn-finish-registration/{username_b64}", post(finish_registration))
        // Login: begin issues the challenge, finish returns a bearer token
        .route("/webauthn-begin-login/{username_b64}", post(begin_login))
        .route("/webauthn-finish-login/{username_b64}", post(finish_login))
        .merge(protected_routes)
        .fallback_service(ServeDir::new(&config.static_dir))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Ok(app)
}
