//! Permission group handlers.

use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::handlers::MessageResponse;
use crate::middleware::AuthUser;
use crate::models::{Permission, PermissionGroup, PermissionRef};
use crate::services::{GroupSearchFilters, GroupUpdate};
use crate::AppState;
use gatekeeper_core::error::AppError;

// ============================================================================
// Request/Response DTOs
// ============================================================================

/// Request to create a group.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateGroupRequest {
    #[validate(length(min = 3, max = 50))]
    pub name: String,
    #[validate(length(max = 255))]
    pub description: String,
}

/// Request to update a group; omitted fields keep their value.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateGroupRequest {
    #[validate(length(min = 3, max = 50))]
    pub name: Option<String>,
    #[validate(length(max = 255))]
    pub description: Option<String>,
}

/// Request to add permissions to a group, by id.
#[derive(Debug, Deserialize, Validate)]
pub struct AddPermissionsRequest {
    #[validate(length(min = 1))]
    pub permission_ids: Vec<Uuid>,
}

/// Request to remove permissions from a group, by value reference.
#[derive(Debug, Deserialize, Validate)]
pub struct RemovePermissionsRequest {
    #[validate(length(min = 1))]
    pub permissions: Vec<PermissionRef>,
}

/// Permission as it appears inside a group response.
#[derive(Debug, Serialize)]
pub struct GroupPermissionResponse {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub service_name: String,
}

impl From<Permission> for GroupPermissionResponse {
    fn from(p: Permission) -> Self {
        Self {
            id: p.id,
            name: p.name,
            description: p.description,
            service_name: p.service.name,
        }
    }
}

/// Group response.
#[derive(Debug, Serialize)]
pub struct GroupResponse {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub permissions: Vec<GroupPermissionResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<PermissionGroup> for GroupResponse {
    fn from(group: PermissionGroup) -> Self {
        Self {
            id: group.id,
            name: group.name().to_string(),
            description: group.description().to_string(),
            permissions: group
                .permissions()
                .into_iter()
                .map(GroupPermissionResponse::from)
                .collect(),
            created_at: group.created_at,
            updated_at: group.updated_at(),
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Create a new permission group owned by the caller.
///
/// POST /groups
pub async fn create_group(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Json(req): Json<CreateGroupRequest>,
) -> Result<(StatusCode, Json<GroupResponse>), AppError> {
    req.validate()?;

    let group = state
        .groups
        .create_group(&req.name, &req.description, claims.user_id)
        .await?;

    Ok((StatusCode::CREATED, Json(GroupResponse::from(group))))
}

/// List or search the caller's groups.
///
/// GET /groups?name=...
pub async fn search_groups(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Query(filters): Query<GroupSearchFilters>,
) -> Result<Json<Vec<GroupResponse>>, AppError> {
    let groups = state.groups.search_groups(filters, claims.user_id).await?;

    Ok(Json(groups.into_iter().map(GroupResponse::from).collect()))
}

/// Get a group by id.
///
/// GET /groups/:group_id
pub async fn get_group(
    State(state): State<AppState>,
    Path(group_id): Path<Uuid>,
) -> Result<Json<GroupResponse>, AppError> {
    let group = state.groups.get_group(group_id).await?;

    Ok(Json(GroupResponse::from(group)))
}

/// Update a group's attributes.
///
/// PUT /groups/:group_id
pub async fn update_group(
    State(state): State<AppState>,
    Path(group_id): Path<Uuid>,
    Json(req): Json<UpdateGroupRequest>,
) -> Result<Json<GroupResponse>, AppError> {
    req.validate()?;

    let group = state
        .groups
        .update_group(
            group_id,
            GroupUpdate {
                name: req.name,
                description: req.description,
            },
        )
        .await?;

    Ok(Json(GroupResponse::from(group)))
}

/// Delete a group.
///
/// DELETE /groups/:group_id
pub async fn delete_group(
    State(state): State<AppState>,
    Path(group_id): Path<Uuid>,
) -> Result<Json<MessageResponse>, AppError> {
    state.groups.delete_group(group_id).await?;

    Ok(Json(MessageResponse {
        message: format!("Group with id {} deleted", group_id),
    }))
}

/// Add permissions to a group in one batch.
///
/// POST /groups/:group_id/permissions
pub async fn add_permissions(
    State(state): State<AppState>,
    Path(group_id): Path<Uuid>,
    Json(req): Json<AddPermissionsRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    req.validate()?;

    let permissions = state.permissions.get_permissions(&req.permission_ids).await?;
    state
        .groups
        .add_permissions_to_group(group_id, permissions)
        .await?;

    Ok(Json(MessageResponse {
        message: "Permissions added to group".to_string(),
    }))
}

/// Remove permissions from a group in one batch.
///
/// DELETE /groups/:group_id/permissions
pub async fn remove_permissions(
    State(state): State<AppState>,
    Path(group_id): Path<Uuid>,
    Json(req): Json<RemovePermissionsRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    req.validate()?;

    state
        .groups
        .remove_permissions_from_group(group_id, &req.permissions)
        .await?;

    Ok(Json(MessageResponse {
        message: "Permissions removed from group".to_string(),
    }))
}

/// Enroll a user in a group.
///
/// POST /groups/:group_id/members/:user_id
pub async fn add_member(
    State(state): State<AppState>,
    Path((group_id, user_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<MessageResponse>, AppError> {
    // The user must exist; enrolling a ghost is a 404, not a silent no-op.
    state.users.get_user(user_id).await?;
    state.groups.assign_user(group_id, user_id).await?;

    Ok(Json(MessageResponse {
        message: "User added to group".to_string(),
    }))
}

/// Remove a user from a group.
///
/// DELETE /groups/:group_id/members/:user_id
pub async fn remove_member(
    State(state): State<AppState>,
    Path((group_id, user_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<MessageResponse>, AppError> {
    state.groups.remove_user(group_id, user_id).await?;

    Ok(Json(MessageResponse {
        message: "User removed from group".to_string(),
    }))
}
