//! Authorization check handler.

use axum::extract::{Json, Query, State};
use serde::{Deserialize, Serialize};

use crate::middleware::AuthUser;
use crate::AppState;
use gatekeeper_core::error::AppError;

#[derive(Debug, Deserialize)]
pub struct AuthzCheckParams {
    pub service: String,
    pub permission: String,
}

#[derive(Debug, Serialize)]
pub struct AuthzCheckResponse {
    pub allowed: bool,
}

/// Does the authenticated user hold a permission on a service?
///
/// GET /authz/check?service=...&permission=...
pub async fn check_permission(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Query(params): Query<AuthzCheckParams>,
) -> Result<Json<AuthzCheckResponse>, AppError> {
    let allowed = state
        .permissions
        .has_permission(claims.user_id, &params.service, &params.permission)
        .await?;

    Ok(Json(AuthzCheckResponse { allowed }))
}
