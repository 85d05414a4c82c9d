//! Shared test harness: in-memory implementations of the repository traits
//! so service behavior can be exercised without a running PostgreSQL.
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use gatekeeper_core::error::AppError;
use gatekeeper_service::config::TokenConfig;
use gatekeeper_service::models::{Permission, PermissionGroup, Service, User};
use gatekeeper_service::services::group::PermissionGroupRepository;
use gatekeeper_service::services::permission::PermissionRepository;
use gatekeeper_service::services::registry::ServiceRepository;
use gatekeeper_service::services::user::UserRepository;
use gatekeeper_service::services::{
    PermissionGroupService, PermissionService, ServiceRegistry, TokenService, UserService,
};
use gatekeeper_service::utils::Argon2Hasher;

#[derive(Clone)]
struct GroupRecord {
    id: Uuid,
    name: String,
    description: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    services: HashMap<Uuid, Service>,
    permissions: HashMap<Uuid, Permission>,
    groups: HashMap<Uuid, GroupRecord>,
    user_groups: HashSet<(Uuid, Uuid)>,
    group_permissions: HashSet<(Uuid, Uuid)>,
}

impl Tables {
    fn hydrate_group(&self, record: &GroupRecord) -> PermissionGroup {
        let mut permissions: Vec<Permission> = self
            .group_permissions
            .iter()
            .filter(|(group_id, _)| *group_id == record.id)
            .filter_map(|(_, permission_id)| self.permissions.get(permission_id).cloned())
            .collect();
        permissions.sort_by(|a, b| a.name.cmp(&b.name));

        PermissionGroup::from_parts(
            record.id,
            record.name.clone(),
            record.description.clone(),
            permissions,
            record.created_at,
            record.updated_at,
        )
    }

    fn user_group_records(&self, user_id: Uuid) -> Vec<&GroupRecord> {
        let mut records: Vec<&GroupRecord> = self
            .user_groups
            .iter()
            .filter(|(member_id, _)| *member_id == user_id)
            .filter_map(|(_, group_id)| self.groups.get(group_id))
            .collect();
        records.sort_by(|a, b| a.name.cmp(&b.name));
        records
    }
}

/// All tables behind one lock; every call is a single critical section,
/// mirroring the per-call transactionality of the real repositories.
#[derive(Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn create(&self, user: &User) -> Result<(), AppError> {
        self.tables
            .lock()
            .unwrap()
            .users
            .insert(user.id, user.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self.tables.lock().unwrap().users.get(&id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn update(&self, user: &User) -> Result<(), AppError> {
        self.tables
            .lock()
            .unwrap()
            .users
            .insert(user.id, user.clone());
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        let mut tables = self.tables.lock().unwrap();
        tables.users.remove(&id);
        tables.user_groups.retain(|(user_id, _)| *user_id != id);
        Ok(())
    }
}

#[async_trait]
impl ServiceRepository for InMemoryStore {
    async fn create(&self, service: &Service) -> Result<(), AppError> {
        self.tables
            .lock()
            .unwrap()
            .services
            .insert(service.id, service.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Service>, AppError> {
        Ok(self.tables.lock().unwrap().services.get(&id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Service>, AppError> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .services
            .values()
            .find(|s| s.name == name)
            .cloned())
    }

    async fn update(&self, service: &Service) -> Result<(), AppError> {
        self.tables
            .lock()
            .unwrap()
            .services
            .insert(service.id, service.clone());
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        let mut tables = self.tables.lock().unwrap();
        tables.services.remove(&id);
        // Cascade to owned permissions, as the schema does.
        let orphaned: Vec<Uuid> = tables
            .permissions
            .values()
            .filter(|p| p.service.id == id)
            .map(|p| p.id)
            .collect();
        for permission_id in orphaned {
            tables.permissions.remove(&permission_id);
            tables
                .group_permissions
                .retain(|(_, pid)| *pid != permission_id);
        }
        Ok(())
    }

    async fn find_all(&self) -> Result<Vec<Service>, AppError> {
        let mut services: Vec<Service> =
            self.tables.lock().unwrap().services.values().cloned().collect();
        services.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(services)
    }
}

#[async_trait]
impl PermissionRepository for InMemoryStore {
    async fn find_by_service(&self, service_id: Uuid) -> Result<Vec<Permission>, AppError> {
        let mut permissions: Vec<Permission> = self
            .tables
            .lock()
            .unwrap()
            .permissions
            .values()
            .filter(|p| p.service.id == service_id)
            .cloned()
            .collect();
        permissions.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(permissions)
    }

    async fn sync_for_service(
        &self,
        _service_id: Uuid,
        upserts: &[Permission],
        removed_ids: &[Uuid],
    ) -> Result<(), AppError> {
        let mut tables = self.tables.lock().unwrap();

        for permission in upserts {
            tables
                .permissions
                .insert(permission.id, permission.clone());
        }

        for permission_id in removed_ids {
            tables.permissions.remove(permission_id);
            tables
                .group_permissions
                .retain(|(_, pid)| pid != permission_id);
        }

        Ok(())
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Permission>, AppError> {
        let tables = self.tables.lock().unwrap();
        Ok(ids
            .iter()
            .filter_map(|id| tables.permissions.get(id).cloned())
            .collect())
    }

    async fn find_user_permissions(
        &self,
        user_id: Uuid,
        service_name: &str,
    ) -> Result<Vec<Permission>, AppError> {
        let tables = self.tables.lock().unwrap();

        let group_ids: HashSet<Uuid> = tables
            .user_groups
            .iter()
            .filter(|(member_id, _)| *member_id == user_id)
            .map(|(_, group_id)| *group_id)
            .collect();

        let mut seen = HashSet::new();
        let permissions = tables
            .group_permissions
            .iter()
            .filter(|(group_id, _)| group_ids.contains(group_id))
            .filter_map(|(_, permission_id)| tables.permissions.get(permission_id))
            .filter(|p| p.service.name == service_name)
            .filter(|p| seen.insert(p.id))
            .cloned()
            .collect();

        Ok(permissions)
    }

    async fn find_group_permissions(&self, group_id: Uuid) -> Result<Vec<Permission>, AppError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .group_permissions
            .iter()
            .filter(|(gid, _)| *gid == group_id)
            .filter_map(|(_, permission_id)| tables.permissions.get(permission_id).cloned())
            .collect())
    }
}

#[async_trait]
impl PermissionGroupRepository for InMemoryStore {
    async fn create(&self, group: &PermissionGroup) -> Result<(), AppError> {
        self.tables.lock().unwrap().groups.insert(
            group.id,
            GroupRecord {
                id: group.id,
                name: group.name().to_string(),
                description: group.description().to_string(),
                created_at: group.created_at,
                updated_at: group.updated_at(),
            },
        );
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PermissionGroup>, AppError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.groups.get(&id).map(|record| tables.hydrate_group(record)))
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<PermissionGroup>, AppError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .groups
            .values()
            .find(|record| record.name == name)
            .map(|record| tables.hydrate_group(record)))
    }

    async fn update(&self, group: &PermissionGroup) -> Result<(), AppError> {
        let mut tables = self.tables.lock().unwrap();
        if let Some(record) = tables.groups.get_mut(&group.id) {
            record.name = group.name().to_string();
            record.description = group.description().to_string();
            record.updated_at = group.updated_at();
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        let mut tables = self.tables.lock().unwrap();
        tables.groups.remove(&id);
        tables.user_groups.retain(|(_, group_id)| *group_id != id);
        tables
            .group_permissions
            .retain(|(group_id, _)| *group_id != id);
        Ok(())
    }

    async fn find_user_groups(&self, user_id: Uuid) -> Result<Vec<PermissionGroup>, AppError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .user_group_records(user_id)
            .into_iter()
            .map(|record| tables.hydrate_group(record))
            .collect())
    }

    async fn search_user_groups(
        &self,
        user_id: Uuid,
        name_pattern: &str,
    ) -> Result<Vec<PermissionGroup>, AppError> {
        let pattern = name_pattern.to_lowercase();
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .user_group_records(user_id)
            .into_iter()
            .filter(|record| record.name.to_lowercase().contains(&pattern))
            .map(|record| tables.hydrate_group(record))
            .collect())
    }

    async fn add_permissions(
        &self,
        group_id: Uuid,
        permission_ids: &[Uuid],
    ) -> Result<(), AppError> {
        let mut tables = self.tables.lock().unwrap();
        for permission_id in permission_ids {
            tables.group_permissions.insert((group_id, *permission_id));
        }
        if let Some(record) = tables.groups.get_mut(&group_id) {
            record.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn remove_permissions(
        &self,
        group_id: Uuid,
        permission_ids: &[Uuid],
    ) -> Result<(), AppError> {
        let mut tables = self.tables.lock().unwrap();
        for permission_id in permission_ids {
            tables.group_permissions.remove(&(group_id, *permission_id));
        }
        if let Some(record) = tables.groups.get_mut(&group_id) {
            record.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn add_member(&self, group_id: Uuid, user_id: Uuid) -> Result<(), AppError> {
        self.tables
            .lock()
            .unwrap()
            .user_groups
            .insert((user_id, group_id));
        Ok(())
    }

    async fn remove_member(&self, group_id: Uuid, user_id: Uuid) -> Result<(), AppError> {
        self.tables
            .lock()
            .unwrap()
            .user_groups
            .remove(&(user_id, group_id));
        Ok(())
    }
}

/// Everything a service-level test needs, wired against one shared store.
pub struct TestHarness {
    pub store: Arc<InMemoryStore>,
    pub tokens: TokenService,
    pub users: UserService,
    pub registry: ServiceRegistry,
    pub permissions: PermissionService,
    pub groups: PermissionGroupService,
}

pub fn harness() -> TestHarness {
    let store = Arc::new(InMemoryStore::default());

    let tokens = TokenService::new(&TokenConfig {
        secret: "test-access-secret".to_string(),
        access_token_ttl_seconds: 86400,
    });
    let users = UserService::new(store.clone(), Arc::new(Argon2Hasher));
    let registry = ServiceRegistry::new(store.clone());
    let permissions = PermissionService::new(store.clone());
    let groups = PermissionGroupService::new(store.clone());

    TestHarness {
        store,
        tokens,
        users,
        registry,
        permissions,
        groups,
    }
}

/// Fresh permission entity for a service's manifest.
pub fn permission(name: &str, service: &Service) -> Permission {
    Permission::new(
        name.to_string(),
        format!("{} capability", name),
        service.clone(),
    )
}
