//! Service registry - CRUD over the downstream services whose permissions
//! this system gates.

use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::{Service, ServiceUpdate};
use gatekeeper_core::error::AppError;

/// Persistence seam for downstream service records.
#[async_trait]
pub trait ServiceRepository: Send + Sync {
    async fn create(&self, service: &Service) -> Result<(), AppError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Service>, AppError>;
    async fn find_by_name(&self, name: &str) -> Result<Option<Service>, AppError>;
    async fn update(&self, service: &Service) -> Result<(), AppError>;
    async fn delete(&self, id: Uuid) -> Result<(), AppError>;
    async fn find_all(&self) -> Result<Vec<Service>, AppError>;
}

#[derive(Clone)]
pub struct ServiceRegistry {
    services: Arc<dyn ServiceRepository>,
}

impl ServiceRegistry {
    pub fn new(services: Arc<dyn ServiceRepository>) -> Self {
        Self { services }
    }

    pub async fn create_service(
        &self,
        name: &str,
        description: &str,
    ) -> Result<Service, AppError> {
        if self.services.find_by_name(name).await?.is_some() {
            return Err(AppError::Conflict(anyhow::anyhow!(
                "Service with name {} already exists",
                name
            )));
        }

        let service = Service::new(name.to_string(), description.to_string());
        self.services.create(&service).await?;

        tracing::info!(service_id = %service.id, name = %service.name, "Service registered");

        Ok(service)
    }

    pub async fn update_service(
        &self,
        id: Uuid,
        update: ServiceUpdate,
    ) -> Result<Service, AppError> {
        let mut service = self
            .services
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("cannot update service with id {}", id)))?;

        service.apply_update(update);
        self.services.update(&service).await?;

        Ok(service)
    }

    /// Delete a service; its permissions go with it (storage cascade).
    pub async fn delete_service(&self, id: Uuid) -> Result<(), AppError> {
        self.services
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("cannot delete service with id {}", id)))?;

        self.services.delete(id).await?;

        tracing::info!(service_id = %id, "Service deleted");

        Ok(())
    }

    pub async fn find_service(&self, id: Uuid) -> Result<Service, AppError> {
        self.services
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Service with id {} not found", id)))
    }

    pub async fn find_service_by_name(&self, name: &str) -> Result<Service, AppError> {
        self.services
            .find_by_name(name)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(anyhow::anyhow!("Service with name {} not found", name))
            })
    }

    pub async fn list_services(&self) -> Result<Vec<Service>, AppError> {
        self.services.find_all().await
    }
}
