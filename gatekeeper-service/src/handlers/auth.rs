//! Authentication handlers: registration and login.

use axum::{
    extract::{Json, State},
    http::StatusCode,
};
use serde::Deserialize;
use validator::Validate;

use crate::models::UserResponse;
use crate::services::TokenResponse;
use crate::AppState;
use gatekeeper_core::error::AppError;

/// Registration request.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 50))]
    pub username: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
}

/// Login request.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Register a new user.
///
/// POST /auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    req.validate()?;

    let user = state.users.register(&req.username, &req.password).await?;

    Ok((StatusCode::CREATED, Json(user.sanitized())))
}

/// Login with username and password; returns a bearer token.
///
/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    let user = state
        .users
        .authenticate(&req.username, &req.password)
        .await?;

    let tokens = state.tokens.issue_for_user(&user)?;

    Ok(Json(tokens))
}
