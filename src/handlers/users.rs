//! # User Handlers
//!
//! Handlers for user-related operations.

use crate::db::users;
use crate::error::AppResult;
use crate::middleware::auth::AuthenticatedUser;
use crate::state::AppState;
use crate::webauthn::types::UserProfile;
use axum::{extract::State, Extension, Json};

/// Get the profile of the user the bearer token belongs to
///
/// ## Route
/// GET /api/users/me
///
/// ## Authentication
/// Requires a bearer token (protected by the require_auth middleware)
///
/// ## Response
/// ```json
/// {
///   "id": "550e8400-e29b-41d4-a716-446655440000",
///   "username": "alice",
///   "name": "alice",
///   "created_at": "2024-01-15T10:30:00+00:00"
/// }
/// ```
///
/// Handle and credential are never part of the response.
pub async fn get_current_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
) -> AppResult<Json<UserProfile>> {
    let user = users::find_by_id(&state.db, &auth.user_id).await?;

    Ok(Json(UserProfile::from(&user)))
}
