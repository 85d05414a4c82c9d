//! Permission service - authorization queries and bulk reconciliation of a
//! service's permission set.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use uuid::Uuid;

use crate::models::Permission;
use gatekeeper_core::error::AppError;

/// Persistence seam for permissions.
#[async_trait]
pub trait PermissionRepository: Send + Sync {
    async fn find_by_service(&self, service_id: Uuid) -> Result<Vec<Permission>, AppError>;

    /// Apply one reconciliation step: upsert `upserts`, delete `removed_ids`.
    /// Implementations apply both in a single transaction.
    async fn sync_for_service(
        &self,
        service_id: Uuid,
        upserts: &[Permission],
        removed_ids: &[Uuid],
    ) -> Result<(), AppError>;

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Permission>, AppError>;

    /// Permissions a user holds on one service, through group membership.
    async fn find_user_permissions(
        &self,
        user_id: Uuid,
        service_name: &str,
    ) -> Result<Vec<Permission>, AppError>;

    async fn find_group_permissions(&self, group_id: Uuid) -> Result<Vec<Permission>, AppError>;
}

#[derive(Clone)]
pub struct PermissionService {
    permissions: Arc<dyn PermissionRepository>,
}

impl PermissionService {
    pub fn new(permissions: Arc<dyn PermissionRepository>) -> Self {
        Self { permissions }
    }

    /// Synchronize the persisted permission set of one service against the
    /// given authoritative list.
    ///
    /// Set-difference reconciliation: entries matching a persisted
    /// permission by name keep its id and update in place; unmatched
    /// entries are inserted; persisted permissions whose name is absent
    /// from the list are deleted. Repeated calls with the same input
    /// converge to the same state.
    ///
    /// All entries must belong to the same service; an empty or
    /// mixed-service list is a caller bug, not a client error.
    pub async fn update_permissions_for_service(
        &self,
        permissions: Vec<Permission>,
    ) -> Result<(), AppError> {
        let service_id = infer_service_id(&permissions)?;

        let current = self.permissions.find_by_service(service_id).await?;
        let current_by_name: HashMap<&str, &Permission> =
            current.iter().map(|p| (p.name.as_str(), p)).collect();

        let upserts: Vec<Permission> = permissions
            .into_iter()
            .map(|p| match current_by_name.get(p.name.as_str()) {
                Some(existing) => Permission {
                    id: existing.id,
                    created_at: existing.created_at,
                    ..p
                },
                None => p,
            })
            .collect();

        let keep: HashSet<&str> = upserts.iter().map(|p| p.name.as_str()).collect();
        let removed_ids: Vec<Uuid> = current
            .iter()
            .filter(|p| !keep.contains(p.name.as_str()))
            .map(|p| p.id)
            .collect();

        self.permissions
            .sync_for_service(service_id, &upserts, &removed_ids)
            .await?;

        tracing::info!(
            service_id = %service_id,
            upserted = upserts.len(),
            removed = removed_ids.len(),
            "Permission set reconciled"
        );

        Ok(())
    }

    /// Does the user hold the named permission on the named service?
    pub async fn has_permission(
        &self,
        user_id: Uuid,
        service_name: &str,
        permission_name: &str,
    ) -> Result<bool, AppError> {
        let permissions = self
            .get_permissions_for_service(user_id, service_name)
            .await?;

        Ok(permissions.iter().any(|p| p.name == permission_name))
    }

    pub async fn get_permissions_for_service(
        &self,
        user_id: Uuid,
        service_name: &str,
    ) -> Result<Vec<Permission>, AppError> {
        self.permissions
            .find_user_permissions(user_id, service_name)
            .await
    }

    /// Resolve permission ids to entities; any unknown id is NotFound.
    pub async fn get_permissions(&self, ids: &[Uuid]) -> Result<Vec<Permission>, AppError> {
        let found = self.permissions.find_by_ids(ids).await?;

        if found.len() != ids.len() {
            let known: HashSet<Uuid> = found.iter().map(|p| p.id).collect();
            let missing: Vec<String> = ids
                .iter()
                .filter(|id| !known.contains(id))
                .map(|id| id.to_string())
                .collect();
            return Err(AppError::NotFound(anyhow::anyhow!(
                "Permissions not found: {}",
                missing.join(", ")
            )));
        }

        Ok(found)
    }
}

fn infer_service_id(permissions: &[Permission]) -> Result<Uuid, AppError> {
    let first = permissions.first().ok_or_else(|| {
        AppError::InternalError(anyhow::anyhow!(
            "Permission reconciliation requires a non-empty permission list"
        ))
    })?;

    let service_id = first.service.id;
    if permissions.iter().any(|p| p.service.id != service_id) {
        return Err(AppError::InternalError(anyhow::anyhow!(
            "Permission reconciliation received permissions for more than one service"
        )));
    }

    Ok(service_id)
}
