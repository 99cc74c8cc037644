mod common;

use base64::prelude::*;
use webauthn_bridge::db::models::UserRecord;
use webauthn_bridge::db::users;
use webauthn_bridge::error::AppError;
use webauthn_bridge::webauthn::identity::{self, HANDLE_LEN};

#[tokio::test]
async fn resolve_or_create_is_idempotent() {
    let pool = common::test_pool().await;

    let first = identity::resolve_or_create(&pool, "alice").await.unwrap();
    let second = identity::resolve_or_create(&pool, "alice").await.unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(first.webauthn_id_b64, second.webauthn_id_b64);
    assert_eq!(common::count_users(&pool).await, 1);
}

#[tokio::test]
async fn new_user_gets_a_random_64_byte_handle() {
    let pool = common::test_pool().await;

    let user = identity::resolve_or_create(&pool, "alice").await.unwrap();
    let handle = BASE64_STANDARD.decode(&user.webauthn_id_b64).unwrap();

    assert_eq!(handle.len(), HANDLE_LEN);
    assert_eq!(user.handle_bytes().unwrap(), handle);
    assert!(user.credential().is_empty());

    // The handle is what's persisted, not just what was returned
    let stored = users::find_by_username(&pool, "alice").await.unwrap();
    assert_eq!(stored.webauthn_id_b64, user.webauthn_id_b64);
}

#[tokio::test]
async fn handles_differ_between_users() {
    let pool = common::test_pool().await;

    let alice = identity::resolve_or_create(&pool, "alice").await.unwrap();
    let bob = identity::resolve_or_create(&pool, "bob").await.unwrap();

    assert_ne!(alice.webauthn_id_b64, bob.webauthn_id_b64);
}

#[tokio::test]
async fn resolve_unknown_user_is_not_found_and_creates_nothing() {
    let pool = common::test_pool().await;

    let result = identity::resolve(&pool, "ghost").await;

    assert!(matches!(result, Err(AppError::NotFound(_))));
    assert_eq!(common::count_users(&pool).await, 0);
}

#[tokio::test]
async fn ensure_handle_never_replaces_a_handle() {
    let pool = common::test_pool().await;
    let user = identity::resolve_or_create(&pool, "alice").await.unwrap();
    let original = user.webauthn_id_b64.clone();

    let again = identity::ensure_handle(&pool, user.clone()).await.unwrap();
    assert_eq!(again.webauthn_id_b64, original);

    // A stale copy read before the handle existed still ends up with the
    // stored handle instead of minting a second one
    let stale = UserRecord {
        webauthn_id_b64: String::new(),
        ..user
    };
    let reconciled = identity::ensure_handle(&pool, stale).await.unwrap();
    assert_eq!(reconciled.webauthn_id_b64, original);

    let stored = users::find_by_username(&pool, "alice").await.unwrap();
    assert_eq!(stored.webauthn_id_b64, original);
}

#[tokio::test]
async fn duplicate_username_is_a_creation_failure() {
    let pool = common::test_pool().await;
    users::create_user(&pool, "alice").await.unwrap();

    let result = users::create_user(&pool, "alice").await;

    assert!(matches!(result, Err(AppError::CreationFailed(_))));
}

#[tokio::test]
async fn display_name_falls_back_to_username() {
    let pool = common::test_pool().await;

    let user = identity::resolve_or_create(&pool, "carol@example.com").await.unwrap();

    assert_eq!(user.display_name(), "carol@example.com");
}
