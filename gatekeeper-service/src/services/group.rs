//! Permission group service - group CRUD, search and membership
//! orchestration.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::{Permission, PermissionGroup, PermissionRef};
use gatekeeper_core::error::AppError;

/// Persistence seam for permission groups and their membership tables.
#[async_trait]
pub trait PermissionGroupRepository: Send + Sync {
    async fn create(&self, group: &PermissionGroup) -> Result<(), AppError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<PermissionGroup>, AppError>;
    async fn find_by_name(&self, name: &str) -> Result<Option<PermissionGroup>, AppError>;
    async fn update(&self, group: &PermissionGroup) -> Result<(), AppError>;
    async fn delete(&self, id: Uuid) -> Result<(), AppError>;

    async fn find_user_groups(&self, user_id: Uuid) -> Result<Vec<PermissionGroup>, AppError>;
    async fn search_user_groups(
        &self,
        user_id: Uuid,
        name_pattern: &str,
    ) -> Result<Vec<PermissionGroup>, AppError>;

    /// Batch membership changes; one round trip for any number of
    /// permissions. Implementations also touch the group's `updated_at`.
    async fn add_permissions(
        &self,
        group_id: Uuid,
        permission_ids: &[Uuid],
    ) -> Result<(), AppError>;
    async fn remove_permissions(
        &self,
        group_id: Uuid,
        permission_ids: &[Uuid],
    ) -> Result<(), AppError>;

    async fn add_member(&self, group_id: Uuid, user_id: Uuid) -> Result<(), AppError>;
    async fn remove_member(&self, group_id: Uuid, user_id: Uuid) -> Result<(), AppError>;
}

/// Field filters for group search. Empty filters fall back to the plain
/// user-group listing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GroupSearchFilters {
    pub name: Option<String>,
}

impl GroupSearchFilters {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
    }
}

/// Partial group update: only supplied fields change.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GroupUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Clone)]
pub struct PermissionGroupService {
    groups: Arc<dyn PermissionGroupRepository>,
}

impl PermissionGroupService {
    pub fn new(groups: Arc<dyn PermissionGroupRepository>) -> Self {
        Self { groups }
    }

    /// Create an empty group and enroll its creator as the first member.
    pub async fn create_group(
        &self,
        name: &str,
        description: &str,
        creator: Uuid,
    ) -> Result<PermissionGroup, AppError> {
        if self.groups.find_by_name(name).await?.is_some() {
            return Err(AppError::Conflict(anyhow::anyhow!(
                "Permission group with name {} already exists",
                name
            )));
        }

        let group = PermissionGroup::new(name.to_string(), description.to_string());
        self.groups.create(&group).await?;
        self.groups.add_member(group.id, creator).await?;

        tracing::info!(group_id = %group.id, name = %group.name(), "Permission group created");

        Ok(group)
    }

    pub async fn get_group(&self, id: Uuid) -> Result<PermissionGroup, AppError> {
        self.groups
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Group with id {} not found", id)))
    }

    pub async fn get_group_by_name(&self, name: &str) -> Result<PermissionGroup, AppError> {
        self.groups
            .find_by_name(name)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(anyhow::anyhow!("Group with name {} not found", name))
            })
    }

    pub async fn update_group(
        &self,
        id: Uuid,
        update: GroupUpdate,
    ) -> Result<PermissionGroup, AppError> {
        let mut group = self
            .groups
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("cannot update group with id {}", id)))?;

        if let Some(name) = update.name {
            group.set_name(name);
        }
        if let Some(description) = update.description {
            group.set_description(description);
        }

        self.groups.update(&group).await?;

        Ok(group)
    }

    pub async fn delete_group(&self, id: Uuid) -> Result<(), AppError> {
        self.groups
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("cannot delete group with id {}", id)))?;

        self.groups.delete(id).await?;

        tracing::info!(group_id = %id, "Permission group deleted");

        Ok(())
    }

    /// Groups the user belongs to. An empty membership is NotFound, not an
    /// empty success.
    pub async fn get_user_groups(&self, user_id: Uuid) -> Result<Vec<PermissionGroup>, AppError> {
        let groups = self.groups.find_user_groups(user_id).await?;

        if groups.is_empty() {
            return Err(AppError::NotFound(anyhow::anyhow!(
                "No permission groups found for user with id {}",
                user_id
            )));
        }

        Ok(groups)
    }

    /// Search the user's groups. Without filters this is exactly
    /// `get_user_groups`, including its NotFound behavior; with filters an
    /// empty result is an empty success.
    pub async fn search_groups(
        &self,
        filters: GroupSearchFilters,
        user_id: Uuid,
    ) -> Result<Vec<PermissionGroup>, AppError> {
        match filters.name {
            None => self.get_user_groups(user_id).await,
            Some(pattern) => self.groups.search_user_groups(user_id, &pattern).await,
        }
    }

    /// Add permissions to a group in one batch.
    ///
    /// The group invariant is checked per entry before anything is written,
    /// so one duplicate rejects the whole batch.
    pub async fn add_permissions_to_group(
        &self,
        group_id: Uuid,
        permissions: Vec<Permission>,
    ) -> Result<(), AppError> {
        let mut group = self.groups.find_by_id(group_id).await?.ok_or_else(|| {
            AppError::NotFound(anyhow::anyhow!(
                "cannot add permissions to group with id {}",
                group_id
            ))
        })?;

        let permission_ids: Vec<Uuid> = permissions.iter().map(|p| p.id).collect();
        for permission in permissions {
            group.add_permission(permission)?;
        }

        self.groups.add_permissions(group_id, &permission_ids).await
    }

    /// Remove permissions from a group in one batch, by value reference.
    pub async fn remove_permissions_from_group(
        &self,
        group_id: Uuid,
        refs: &[PermissionRef],
    ) -> Result<(), AppError> {
        let mut group = self.groups.find_by_id(group_id).await?.ok_or_else(|| {
            AppError::NotFound(anyhow::anyhow!(
                "cannot remove permissions from group with id {}",
                group_id
            ))
        })?;

        let mut permission_ids = Vec::new();
        for r in refs {
            let removed = group.remove_permission(&r.service_name, &r.permission_name)?;
            permission_ids.extend(removed.into_iter().map(|p| p.id));
        }

        self.groups
            .remove_permissions(group_id, &permission_ids)
            .await
    }

    pub async fn assign_user(&self, group_id: Uuid, user_id: Uuid) -> Result<(), AppError> {
        self.groups.find_by_id(group_id).await?.ok_or_else(|| {
            AppError::NotFound(anyhow::anyhow!(
                "cannot assign user to group with id {}",
                group_id
            ))
        })?;

        self.groups.add_member(group_id, user_id).await
    }

    pub async fn remove_user(&self, group_id: Uuid, user_id: Uuid) -> Result<(), AppError> {
        self.groups.find_by_id(group_id).await?.ok_or_else(|| {
            AppError::NotFound(anyhow::anyhow!(
                "cannot remove user from group with id {}",
                group_id
            ))
        })?;

        self.groups.remove_member(group_id, user_id).await
    }
}
