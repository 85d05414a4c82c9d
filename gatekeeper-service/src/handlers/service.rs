//! Downstream service handlers: registry CRUD and permission manifest
//! synchronization.

use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::handlers::MessageResponse;
use crate::models::{Permission, Service, ServiceUpdate};
use crate::AppState;
use gatekeeper_core::error::AppError;

// ============================================================================
// Request DTOs
// ============================================================================

/// Request to register a downstream service.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateServiceRequest {
    #[validate(length(min = 3, max = 50))]
    pub name: String,
    #[validate(length(max = 255))]
    pub description: String,
}

/// Request to update a service; omitted fields keep their value.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateServiceRequest {
    #[validate(length(min = 3, max = 50))]
    pub name: Option<String>,
    #[validate(length(max = 255))]
    pub description: Option<String>,
    pub url: Option<String>,
    pub icon: Option<String>,
    pub version: Option<String>,
}

/// One entry of a service's permission manifest.
#[derive(Debug, Deserialize)]
pub struct PermissionManifestEntry {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// The authoritative permission manifest for a service.
#[derive(Debug, Deserialize, Validate)]
pub struct SyncPermissionsRequest {
    #[validate(length(min = 1))]
    pub permissions: Vec<PermissionManifestEntry>,
}

// ============================================================================
// Handlers
// ============================================================================

/// Register a new downstream service.
///
/// POST /services
pub async fn create_service(
    State(state): State<AppState>,
    Json(req): Json<CreateServiceRequest>,
) -> Result<(StatusCode, Json<Service>), AppError> {
    req.validate()?;

    let service = state
        .registry
        .create_service(&req.name, &req.description)
        .await?;

    Ok((StatusCode::CREATED, Json(service)))
}

/// List all registered services.
///
/// GET /services
pub async fn list_services(
    State(state): State<AppState>,
) -> Result<Json<Vec<Service>>, AppError> {
    let services = state.registry.list_services().await?;

    Ok(Json(services))
}

/// Get a service by id.
///
/// GET /services/:service_id
pub async fn get_service(
    State(state): State<AppState>,
    Path(service_id): Path<Uuid>,
) -> Result<Json<Service>, AppError> {
    let service = state.registry.find_service(service_id).await?;

    Ok(Json(service))
}

/// Update a service's attributes.
///
/// PATCH /services/:service_id
pub async fn update_service(
    State(state): State<AppState>,
    Path(service_id): Path<Uuid>,
    Json(req): Json<UpdateServiceRequest>,
) -> Result<Json<Service>, AppError> {
    req.validate()?;

    let service = state
        .registry
        .update_service(
            service_id,
            ServiceUpdate {
                name: req.name,
                description: req.description,
                url: req.url,
                icon: req.icon,
                version: req.version,
            },
        )
        .await?;

    Ok(Json(service))
}

/// Delete a service and, by cascade, its permissions.
///
/// DELETE /services/:service_id
pub async fn delete_service(
    State(state): State<AppState>,
    Path(service_id): Path<Uuid>,
) -> Result<Json<MessageResponse>, AppError> {
    state.registry.delete_service(service_id).await?;

    Ok(Json(MessageResponse {
        message: format!("Service with id {} deleted", service_id),
    }))
}

/// Synchronize a service's permission set against its manifest.
///
/// PUT /services/:service_id/permissions
///
/// The manifest is authoritative: entries are upserted, everything else
/// the service owns is deleted. Safe to repeat.
pub async fn sync_permissions(
    State(state): State<AppState>,
    Path(service_id): Path<Uuid>,
    Json(req): Json<SyncPermissionsRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    req.validate()?;

    let service = state.registry.find_service(service_id).await?;

    let permissions: Vec<Permission> = req
        .permissions
        .into_iter()
        .map(|entry| Permission::new(entry.name, entry.description, service.clone()))
        .collect();

    state
        .permissions
        .update_permissions_for_service(permissions)
        .await?;

    Ok(Json(MessageResponse {
        message: "Permissions synchronized".to_string(),
    }))
}
