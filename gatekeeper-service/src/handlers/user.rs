//! User profile handlers.

use axum::extract::{Json, State};
use serde::Deserialize;
use validator::Validate;

use crate::handlers::MessageResponse;
use crate::middleware::AuthUser;
use crate::models::UserResponse;
use crate::AppState;
use gatekeeper_core::error::AppError;

#[derive(Debug, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    #[validate(length(min = 8, max = 128))]
    pub new_password: String,
}

/// Get the authenticated user's profile.
///
/// GET /users/me
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<Json<UserResponse>, AppError> {
    let user = state.users.get_user(claims.user_id).await?;

    Ok(Json(user.sanitized()))
}

/// Change the authenticated user's password.
///
/// POST /users/me/password
pub async fn change_password(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    req.validate()?;

    state
        .users
        .change_password(claims.user_id, &req.current_password, &req.new_password)
        .await?;

    Ok(Json(MessageResponse {
        message: "Password changed".to_string(),
    }))
}

/// Delete the authenticated user's account.
///
/// DELETE /users/me
pub async fn delete_me(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<Json<MessageResponse>, AppError> {
    state.users.delete_user(claims.user_id).await?;

    Ok(Json(MessageResponse {
        message: "Account deleted".to_string(),
    }))
}
