//! Service model - downstream applications whose capabilities are gated
//! by permissions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Downstream service entity. Owns its permissions: deleting a service
/// cascades to them at the storage layer.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Service {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub url: Option<String>,
    pub icon: Option<String>,
    pub version: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial update: only supplied fields change.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub icon: Option<String>,
    pub version: Option<String>,
}

impl Service {
    /// Create a new service with a freshly generated id.
    pub fn new(name: String, description: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name,
            description,
            url: None,
            icon: None,
            version: "1.0.0".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Apply a partial update; an omitted field never clears a value.
    pub fn apply_update(&mut self, update: ServiceUpdate) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(description) = update.description {
            self.description = description;
        }
        if let Some(url) = update.url {
            self.url = Some(url);
        }
        if let Some(icon) = update.icon {
            self.icon = Some(icon);
        }
        if let Some(version) = update.version {
            self.version = version;
        }
        self.touch();
    }
}
