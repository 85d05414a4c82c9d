//! Permission model - a named capability scoped to exactly one service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::Service;

/// Permission entity.
///
/// For authorization purposes two permissions are the same when their
/// service name and permission name agree; ids are storage identity only.
/// Reconciliation and group membership both rely on this.
#[derive(Debug, Clone, Serialize)]
pub struct Permission {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub service: Service,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A permission named by value, without storage identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionRef {
    pub service_name: String,
    pub permission_name: String,
}

impl Permission {
    /// Create a new permission with a freshly generated id.
    pub fn new(name: String, description: String, service: Service) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name,
            description,
            service,
            created_at: now,
            updated_at: now,
        }
    }

    /// Value equality: same service name and permission name.
    pub fn is_equal(&self, other: &Permission) -> bool {
        self.name == other.name && self.service.name == other.service.name
    }

    /// Value equality against a bare (service, permission) name pair.
    pub fn matches(&self, service_name: &str, permission_name: &str) -> bool {
        self.name == permission_name && self.service.name == service_name
    }
}
