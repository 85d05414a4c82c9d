//! User service - registration and credential checks.

use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::User;
use gatekeeper_core::error::AppError;

/// Persistence seam for user accounts.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: &User) -> Result<(), AppError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError>;
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError>;
    async fn update(&self, user: &User) -> Result<(), AppError>;
    async fn delete(&self, id: Uuid) -> Result<(), AppError>;
}

/// Password hashing capability. The service never sees hashing internals.
#[async_trait]
pub trait PasswordHasher: Send + Sync {
    async fn hash(&self, password: &str) -> Result<String, AppError>;
    async fn verify(&self, password: &str, hash: &str) -> Result<bool, AppError>;
}

#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UserRepository>,
    hasher: Arc<dyn PasswordHasher>,
}

impl UserService {
    pub fn new(users: Arc<dyn UserRepository>, hasher: Arc<dyn PasswordHasher>) -> Self {
        Self { users, hasher }
    }

    /// Register a new account. The email is derived from the username until
    /// the account sets a real one.
    pub async fn register(&self, username: &str, password: &str) -> Result<User, AppError> {
        if self.users.find_by_username(username).await?.is_some() {
            return Err(AppError::Conflict(anyhow::anyhow!(
                "User with username {} already exists",
                username
            )));
        }

        let hashed_password = self.hasher.hash(password).await?;
        let user = User::new(
            username.to_string(),
            format!("{}@example.com", username),
            hashed_password,
        );

        self.users.create(&user).await?;

        tracing::info!(user_id = %user.id, "User registered");

        Ok(user)
    }

    /// Check credentials and return the account.
    ///
    /// An unknown username is NotFound; a wrong password is Unauthorized.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<User, AppError> {
        let user = self
            .users
            .find_by_username(username)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(anyhow::anyhow!("User with username {} not found", username))
            })?;

        if !self
            .hasher
            .verify(password, &user.hashed_password)
            .await?
        {
            return Err(AppError::Unauthorized(anyhow::anyhow!(
                "Invalid password for user {}",
                username
            )));
        }

        Ok(user)
    }

    pub async fn get_user(&self, id: Uuid) -> Result<User, AppError> {
        self.users
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("User with id {} not found", id)))
    }

    /// Replace the credential hash after checking the current password.
    pub async fn change_password(
        &self,
        id: Uuid,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AppError> {
        let mut user = self.get_user(id).await?;

        if !self
            .hasher
            .verify(current_password, &user.hashed_password)
            .await?
        {
            return Err(AppError::Unauthorized(anyhow::anyhow!(
                "Current password does not match"
            )));
        }

        let hashed_password = self.hasher.hash(new_password).await?;
        user.set_hashed_password(hashed_password);
        self.users.update(&user).await?;

        tracing::info!(user_id = %user.id, "Password changed");

        Ok(())
    }

    pub async fn delete_user(&self, id: Uuid) -> Result<(), AppError> {
        self.get_user(id).await?;
        self.users.delete(id).await?;

        tracing::info!(user_id = %id, "User deleted");

        Ok(())
    }
}
