//! Permission group model - a named, reusable bundle of permissions
//! assignable to users.

use chrono::{DateTime, Utc};
use gatekeeper_core::error::AppError;
use uuid::Uuid;

use crate::models::Permission;

/// Permission group aggregate.
///
/// Membership is a set under permission value equality: no two entries may
/// share a (service name, permission name) pair. Every attribute or
/// membership mutation touches `updated_at`.
#[derive(Debug, Clone)]
pub struct PermissionGroup {
    pub id: Uuid,
    name: String,
    description: String,
    permissions: Vec<Permission>,
    pub created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PermissionGroup {
    /// Create a new, empty group with a freshly generated id.
    pub fn new(name: String, description: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name,
            description,
            permissions: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Rehydrate a group from stored state.
    pub fn from_parts(
        id: Uuid,
        name: String,
        description: String,
        permissions: Vec<Permission>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name,
            description,
            permissions,
            created_at,
            updated_at,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Defensive copy; mutating the returned vector does not affect the group.
    pub fn permissions(&self) -> Vec<Permission> {
        self.permissions.clone()
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn set_name(&mut self, name: String) {
        self.name = name;
        self.touch();
    }

    pub fn set_description(&mut self, description: String) {
        self.description = description;
        self.touch();
    }

    /// Add a permission to the group.
    ///
    /// Fails when an entry equal under the (service, name) rule already
    /// exists; the group is left untouched in that case.
    pub fn add_permission(&mut self, permission: Permission) -> Result<(), AppError> {
        if self.permissions.iter().any(|p| p.is_equal(&permission)) {
            return Err(AppError::PermissionAlreadyAssigned(format!(
                "Permission {} on service {} is already assigned to group {}",
                permission.name, permission.service.name, self.name
            )));
        }
        self.permissions.push(permission);
        self.touch();
        Ok(())
    }

    /// Remove every entry equal to the given (service, permission) pair and
    /// return the removed entries.
    ///
    /// Fails when nothing matched; the group is left untouched in that case.
    pub fn remove_permission(
        &mut self,
        service_name: &str,
        permission_name: &str,
    ) -> Result<Vec<Permission>, AppError> {
        let (removed, kept): (Vec<Permission>, Vec<Permission>) = self
            .permissions
            .drain(..)
            .partition(|p| p.matches(service_name, permission_name));

        self.permissions = kept;

        if removed.is_empty() {
            return Err(AppError::PermissionNotFoundInGroup(format!(
                "Permission {} on service {} is not assigned to group {}",
                permission_name, service_name, self.name
            )));
        }

        self.touch();
        Ok(removed)
    }

    /// Existence check under the same value-equality rule.
    pub fn has_permission(&self, service_name: &str, permission_name: &str) -> bool {
        self.permissions
            .iter()
            .any(|p| p.matches(service_name, permission_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Service;

    fn permission(service_name: &str, name: &str) -> Permission {
        let service = Service::new(service_name.to_string(), format!("{} service", service_name));
        Permission::new(name.to_string(), format!("{} capability", name), service)
    }

    #[test]
    fn test_add_duplicate_fails() {
        let mut group = PermissionGroup::new("editors".to_string(), "Editing staff".to_string());

        group
            .add_permission(permission("docs", "document.write"))
            .unwrap();

        // Same service+name with a different id is still a duplicate.
        let err = group
            .add_permission(permission("docs", "document.write"))
            .unwrap_err();
        assert!(matches!(err, AppError::PermissionAlreadyAssigned(_)));
        assert_eq!(group.permissions().len(), 1);
    }

    #[test]
    fn test_remove_absent_fails() {
        let mut group = PermissionGroup::new("editors".to_string(), "Editing staff".to_string());

        let err = group
            .remove_permission("docs", "document.write")
            .unwrap_err();
        assert!(matches!(err, AppError::PermissionNotFoundInGroup(_)));
    }

    #[test]
    fn test_remove_drops_all_equal_entries() {
        let a = permission("docs", "document.write");
        let b = permission("docs", "document.write");
        let c = permission("docs", "document.read");

        // Rehydrated state may carry duplicates from before the invariant
        // was enforced; removal must clear them all.
        let mut group = PermissionGroup::from_parts(
            Uuid::new_v4(),
            "editors".to_string(),
            "Editing staff".to_string(),
            vec![a, b, c],
            Utc::now(),
            Utc::now(),
        );

        let removed = group.remove_permission("docs", "document.write").unwrap();
        assert_eq!(removed.len(), 2);
        assert_eq!(group.permissions().len(), 1);
        assert!(group.has_permission("docs", "document.read"));
        assert!(!group.has_permission("docs", "document.write"));
    }

    #[test]
    fn test_permissions_returns_defensive_copy() {
        let mut group = PermissionGroup::new("viewers".to_string(), "Read-only".to_string());
        group
            .add_permission(permission("docs", "document.read"))
            .unwrap();

        let mut copy = group.permissions();
        copy.clear();

        assert_eq!(group.permissions().len(), 1);
    }

    #[test]
    fn test_mutations_touch_updated_at() {
        let mut group = PermissionGroup::new("viewers".to_string(), "Read-only".to_string());
        let before = group.updated_at();

        group.set_description("Read-only access".to_string());
        assert!(group.updated_at() >= before);

        let before = group.updated_at();
        group
            .add_permission(permission("docs", "document.read"))
            .unwrap();
        assert!(group.updated_at() >= before);
    }

    #[test]
    fn test_failed_add_leaves_group_untouched() {
        let mut group = PermissionGroup::new("viewers".to_string(), "Read-only".to_string());
        group
            .add_permission(permission("docs", "document.read"))
            .unwrap();
        let stamp = group.updated_at();

        let _ = group.add_permission(permission("docs", "document.read"));
        assert_eq!(group.updated_at(), stamp);
        assert_eq!(group.permissions().len(), 1);
    }
}
