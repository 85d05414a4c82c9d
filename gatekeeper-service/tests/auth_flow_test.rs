//! End-to-end account flows: register, login, token issuance, password
//! change, account deletion.

mod common;

use common::harness;
use gatekeeper_core::error::AppError;

#[tokio::test]
async fn register_then_login_returns_configured_ttl() {
    let h = harness();

    let user = h.users.register("alice", "secret123").await.unwrap();
    assert_eq!(user.username, "alice");
    assert_eq!(user.email, "alice@example.com");

    let account = h.users.authenticate("alice", "secret123").await.unwrap();
    assert_eq!(account.id, user.id);

    let tokens = h.tokens.issue_for_user(&account).unwrap();
    assert_eq!(tokens.expires_in, 86400);

    let claims = h.tokens.verify(&tokens.access_token).unwrap();
    assert_eq!(claims.user_id, user.id);
    assert_eq!(claims.username, "alice");
    assert_eq!(claims.email, "alice@example.com");
}

#[tokio::test]
async fn login_with_wrong_password_is_unauthorized() {
    let h = harness();
    h.users.register("alice", "secret123").await.unwrap();

    let err = h
        .users
        .authenticate("alice", "not-the-password")
        .await
        .unwrap_err();

    // Wrong password is a credential failure, not a missing account.
    assert!(matches!(err, AppError::Unauthorized(_)));
}

#[tokio::test]
async fn login_with_unknown_username_is_not_found() {
    let h = harness();

    let err = h
        .users
        .authenticate("nobody", "secret123")
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn duplicate_registration_conflicts() {
    let h = harness();
    h.users.register("alice", "secret123").await.unwrap();

    let err = h.users.register("alice", "different9").await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
}

#[tokio::test]
async fn change_password_requires_current_password() {
    let h = harness();
    let user = h.users.register("alice", "secret123").await.unwrap();

    let err = h
        .users
        .change_password(user.id, "wrong-current", "newsecret1")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Unauthorized(_)));

    h.users
        .change_password(user.id, "secret123", "newsecret1")
        .await
        .unwrap();

    assert!(matches!(
        h.users.authenticate("alice", "secret123").await.unwrap_err(),
        AppError::Unauthorized(_)
    ));
    h.users.authenticate("alice", "newsecret1").await.unwrap();
}

#[tokio::test]
async fn deleted_account_cannot_login() {
    let h = harness();
    let user = h.users.register("alice", "secret123").await.unwrap();

    h.users.delete_user(user.id).await.unwrap();

    let err = h
        .users
        .authenticate("alice", "secret123")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let err = h.users.delete_user(user.id).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}
