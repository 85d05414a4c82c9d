//! PostgreSQL persistence for gatekeeper.
//!
//! One clonable wrapper around the pool implements every repository trait.
//! Reconciliation and batch membership changes run inside a transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::{Permission, PermissionGroup, Service, User};
use crate::services::group::PermissionGroupRepository;
use crate::services::permission::PermissionRepository;
use crate::services::registry::ServiceRepository;
use crate::services::user::UserRepository;
use gatekeeper_core::error::AppError;

/// PostgreSQL database wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

/// Permission joined with its owning service.
#[derive(Debug, FromRow)]
struct PermissionRow {
    id: Uuid,
    name: String,
    description: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    service_id: Uuid,
    service_name: String,
    service_description: String,
    service_url: Option<String>,
    service_icon: Option<String>,
    service_version: String,
    service_created_at: DateTime<Utc>,
    service_updated_at: DateTime<Utc>,
}

impl From<PermissionRow> for Permission {
    fn from(row: PermissionRow) -> Self {
        Permission {
            id: row.id,
            name: row.name,
            description: row.description,
            service: Service {
                id: row.service_id,
                name: row.service_name,
                description: row.service_description,
                url: row.service_url,
                icon: row.service_icon,
                version: row.service_version,
                created_at: row.service_created_at,
                updated_at: row.service_updated_at,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Group attribute columns; permissions are hydrated separately.
#[derive(Debug, FromRow)]
struct GroupRow {
    id: Uuid,
    name: String,
    description: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

const PERMISSION_SELECT: &str = r#"
    SELECT p.id, p.name, p.description, p.created_at, p.updated_at,
           s.id AS service_id, s.name AS service_name,
           s.description AS service_description, s.url AS service_url,
           s.icon AS service_icon, s.version AS service_version,
           s.created_at AS service_created_at, s.updated_at AS service_updated_at
    FROM permissions p
    JOIN services s ON s.id = p.service_id
"#;

impl Database {
    /// Create a new database wrapper from a connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Health check - ping the database.
    pub async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Database health check failed: {}", e);
                AppError::DatabaseError(anyhow::anyhow!("Database health check failed: {}", e))
            })?;
        Ok(())
    }

    async fn hydrate_group(&self, row: GroupRow) -> Result<PermissionGroup, AppError> {
        let permissions = self.find_group_permissions(row.id).await?;
        Ok(PermissionGroup::from_parts(
            row.id,
            row.name,
            row.description,
            permissions,
            row.created_at,
            row.updated_at,
        ))
    }

    async fn hydrate_groups(&self, rows: Vec<GroupRow>) -> Result<Vec<PermissionGroup>, AppError> {
        let mut groups = Vec::with_capacity(rows.len());
        for row in rows {
            groups.push(self.hydrate_group(row).await?);
        }
        Ok(groups)
    }
}

// ==================== User Operations ====================

#[async_trait]
impl UserRepository for Database {
    async fn create(&self, user: &User) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, username, hashed_password, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.username)
        .bind(&user.hashed_password)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn update(&self, user: &User) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE users
            SET email = $1, username = $2, hashed_password = $3, updated_at = $4
            WHERE id = $5
            "#,
        )
        .bind(&user.email)
        .bind(&user.username)
        .bind(&user.hashed_password)
        .bind(user.updated_at)
        .bind(user.id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

// ==================== Service Operations ====================

#[async_trait]
impl ServiceRepository for Database {
    async fn create(&self, service: &Service) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO services (id, name, description, url, icon, version, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(service.id)
        .bind(&service.name)
        .bind(&service.description)
        .bind(&service.url)
        .bind(&service.icon)
        .bind(&service.version)
        .bind(service.created_at)
        .bind(service.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Service>, AppError> {
        let service = sqlx::query_as::<_, Service>("SELECT * FROM services WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(service)
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Service>, AppError> {
        let service = sqlx::query_as::<_, Service>("SELECT * FROM services WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(service)
    }

    async fn update(&self, service: &Service) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE services
            SET name = $1, description = $2, url = $3, icon = $4, version = $5, updated_at = $6
            WHERE id = $7
            "#,
        )
        .bind(&service.name)
        .bind(&service.description)
        .bind(&service.url)
        .bind(&service.icon)
        .bind(&service.version)
        .bind(service.updated_at)
        .bind(service.id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        sqlx::query("DELETE FROM services WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find_all(&self) -> Result<Vec<Service>, AppError> {
        let services = sqlx::query_as::<_, Service>("SELECT * FROM services ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(services)
    }
}

// ==================== Permission Operations ====================

#[async_trait]
impl PermissionRepository for Database {
    async fn find_by_service(&self, service_id: Uuid) -> Result<Vec<Permission>, AppError> {
        let rows = sqlx::query_as::<_, PermissionRow>(&format!(
            "{} WHERE p.service_id = $1 ORDER BY p.name",
            PERMISSION_SELECT
        ))
        .bind(service_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Permission::from).collect())
    }

    async fn sync_for_service(
        &self,
        service_id: Uuid,
        upserts: &[Permission],
        removed_ids: &[Uuid],
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        for permission in upserts {
            sqlx::query(
                r#"
                INSERT INTO permissions (id, name, service_id, description, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6)
                ON CONFLICT (id) DO UPDATE
                SET name = EXCLUDED.name,
                    description = EXCLUDED.description,
                    updated_at = NOW()
                WHERE permissions.name IS DISTINCT FROM EXCLUDED.name
                   OR permissions.description IS DISTINCT FROM EXCLUDED.description
                "#,
            )
            .bind(permission.id)
            .bind(&permission.name)
            .bind(service_id)
            .bind(&permission.description)
            .bind(permission.created_at)
            .bind(permission.updated_at)
            .execute(&mut *tx)
            .await?;
        }

        if !removed_ids.is_empty() {
            sqlx::query("DELETE FROM permissions WHERE service_id = $1 AND id = ANY($2)")
                .bind(service_id)
                .bind(removed_ids)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Permission>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, PermissionRow>(&format!(
            "{} WHERE p.id = ANY($1)",
            PERMISSION_SELECT
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Permission::from).collect())
    }

    async fn find_user_permissions(
        &self,
        user_id: Uuid,
        service_name: &str,
    ) -> Result<Vec<Permission>, AppError> {
        let rows = sqlx::query_as::<_, PermissionRow>(&format!(
            r#"
            {}
            JOIN group_permissions gp ON gp.permission_id = p.id
            JOIN user_groups ug ON ug.group_id = gp.group_id
            WHERE ug.user_id = $1 AND s.name = $2
            GROUP BY p.id, p.name, p.description, p.created_at, p.updated_at,
                     s.id, s.name, s.description, s.url, s.icon, s.version,
                     s.created_at, s.updated_at
            "#,
            PERMISSION_SELECT
        ))
        .bind(user_id)
        .bind(service_name)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Permission::from).collect())
    }

    async fn find_group_permissions(&self, group_id: Uuid) -> Result<Vec<Permission>, AppError> {
        let rows = sqlx::query_as::<_, PermissionRow>(&format!(
            r#"
            {}
            JOIN group_permissions gp ON gp.permission_id = p.id
            WHERE gp.group_id = $1
            "#,
            PERMISSION_SELECT
        ))
        .bind(group_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Permission::from).collect())
    }
}

// ==================== Permission Group Operations ====================

#[async_trait]
impl PermissionGroupRepository for Database {
    async fn create(&self, group: &PermissionGroup) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO groups (id, name, description, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(group.id)
        .bind(group.name())
        .bind(group.description())
        .bind(group.created_at)
        .bind(group.updated_at())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PermissionGroup>, AppError> {
        let row = sqlx::query_as::<_, GroupRow>("SELECT * FROM groups WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(self.hydrate_group(row).await?)),
            None => Ok(None),
        }
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<PermissionGroup>, AppError> {
        let row = sqlx::query_as::<_, GroupRow>("SELECT * FROM groups WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(self.hydrate_group(row).await?)),
            None => Ok(None),
        }
    }

    async fn update(&self, group: &PermissionGroup) -> Result<(), AppError> {
        sqlx::query("UPDATE groups SET name = $1, description = $2, updated_at = $3 WHERE id = $4")
            .bind(group.name())
            .bind(group.description())
            .bind(group.updated_at())
            .bind(group.id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        sqlx::query("DELETE FROM groups WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find_user_groups(&self, user_id: Uuid) -> Result<Vec<PermissionGroup>, AppError> {
        let rows = sqlx::query_as::<_, GroupRow>(
            r#"
            SELECT g.id, g.name, g.description, g.created_at, g.updated_at
            FROM groups g
            JOIN user_groups ug ON ug.group_id = g.id
            WHERE ug.user_id = $1
            ORDER BY g.name
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        self.hydrate_groups(rows).await
    }

    async fn search_user_groups(
        &self,
        user_id: Uuid,
        name_pattern: &str,
    ) -> Result<Vec<PermissionGroup>, AppError> {
        let rows = sqlx::query_as::<_, GroupRow>(
            r#"
            SELECT g.id, g.name, g.description, g.created_at, g.updated_at
            FROM groups g
            JOIN user_groups ug ON ug.group_id = g.id
            WHERE ug.user_id = $1 AND g.name ILIKE $2
            ORDER BY g.name
            "#,
        )
        .bind(user_id)
        .bind(format!("%{}%", name_pattern))
        .fetch_all(&self.pool)
        .await?;

        self.hydrate_groups(rows).await
    }

    async fn add_permissions(
        &self,
        group_id: Uuid,
        permission_ids: &[Uuid],
    ) -> Result<(), AppError> {
        if permission_ids.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO group_permissions (group_id, permission_id)
            SELECT $1, permission_id FROM UNNEST($2::uuid[]) AS t(permission_id)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(group_id)
        .bind(permission_ids)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE groups SET updated_at = NOW() WHERE id = $1")
            .bind(group_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn remove_permissions(
        &self,
        group_id: Uuid,
        permission_ids: &[Uuid],
    ) -> Result<(), AppError> {
        if permission_ids.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM group_permissions WHERE group_id = $1 AND permission_id = ANY($2)")
            .bind(group_id)
            .bind(permission_ids)
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE groups SET updated_at = NOW() WHERE id = $1")
            .bind(group_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn add_member(&self, group_id: Uuid, user_id: Uuid) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO user_groups (user_id, group_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(group_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove_member(&self, group_id: Uuid, user_id: Uuid) -> Result<(), AppError> {
        sqlx::query("DELETE FROM user_groups WHERE user_id = $1 AND group_id = $2")
            .bind(user_id)
            .bind(group_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
