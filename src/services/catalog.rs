//! Equipment and installation type catalogs

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    error::{AppError, AppResult},
    models::{CatalogEntry, System},
    repository::Repository,
};

/// Read-only access to the type catalogs
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TypeCatalog: Send + Sync {
    async fn equipment_types(&self, system: System) -> AppResult<Vec<CatalogEntry>>;
    async fn installation_types(&self, system: System) -> AppResult<Vec<CatalogEntry>>;
    async fn equipment_type(&self, system: System, code: &str) -> AppResult<Option<CatalogEntry>>;
    async fn installation_type(&self, system: System, code: &str)
        -> AppResult<Option<CatalogEntry>>;
}

pub struct PgTypeCatalog {
    repository: Repository,
}

impl PgTypeCatalog {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl TypeCatalog for PgTypeCatalog {
    async fn equipment_types(&self, system: System) -> AppResult<Vec<CatalogEntry>> {
        self.repository.catalog_equipment_types(system).await
    }

    async fn installation_types(&self, system: System) -> AppResult<Vec<CatalogEntry>> {
        self.repository.catalog_installation_types(system).await
    }

    async fn equipment_type(&self, system: System, code: &str) -> AppResult<Option<CatalogEntry>> {
        self.repository.catalog_equipment_type(system, code).await
    }

    async fn installation_type(
        &self,
        system: System,
        code: &str,
    ) -> AppResult<Option<CatalogEntry>> {
        self.repository.catalog_installation_type(system, code).await
    }
}

#[derive(Clone)]
pub struct CatalogService {
    catalog: Arc<dyn TypeCatalog>,
}

impl CatalogService {
    pub fn new(catalog: Arc<dyn TypeCatalog>) -> Self {
        Self { catalog }
    }

    pub async fn equipment_types(&self, system: System) -> AppResult<Vec<CatalogEntry>> {
        self.catalog.equipment_types(system).await
    }

    pub async fn installation_types(&self, system: System) -> AppResult<Vec<CatalogEntry>> {
        self.catalog.installation_types(system).await
    }

    /// Reject codes that are unknown or retired for this system
    pub async fn require_equipment_type(&self, system: System, code: &str) -> AppResult<CatalogEntry> {
        match self.catalog.equipment_type(system, code).await? {
            Some(entry) if entry.active => Ok(entry),
            _ => Err(AppError::Validation(format!(
                "Unknown equipment type '{}' for {}",
                code, system
            ))),
        }
    }

    pub async fn require_installation_type(
        &self,
        system: System,
        code: &str,
    ) -> AppResult<CatalogEntry> {
        match self.catalog.installation_type(system, code).await? {
            Some(entry) if entry.active => Ok(entry),
            _ => Err(AppError::Validation(format!(
                "Unknown installation type '{}' for {}",
                code, system
            ))),
        }
    }

    /// Display name for repair snapshots; retired types keep their name
    pub async fn equipment_type_name(&self, system: System, code: &str) -> AppResult<Option<String>> {
        Ok(self
            .catalog
            .equipment_type(system, code)
            .await?
            .map(|entry| entry.name))
    }
}
