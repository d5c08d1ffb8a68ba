//! Business logic services

pub mod binding;
pub mod catalog;
pub mod equipment;
pub mod history;
pub mod installations;
pub mod repairs;

use std::sync::Arc;

use crate::{config::RepairsConfig, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub equipment: equipment::EquipmentService,
    pub installations: installations::InstallationService,
    pub binding: binding::BindingService,
    pub repairs: repairs::RepairService,
    pub catalog: catalog::CatalogService,
    pub history: history::HistoryService,
    repository: Repository,
}

impl Services {
    /// Create all services with the given repository, backed by the Postgres collaborators
    pub fn new(repository: Repository, repairs_config: RepairsConfig) -> Self {
        let catalog = catalog::CatalogService::new(Arc::new(catalog::PgTypeCatalog::new(
            repository.clone(),
        )));
        let history = history::HistoryService::new(Arc::new(history::PgChangeRecorder::new(
            repository.clone(),
        )));
        Self::with_collaborators(repository, repairs_config, catalog, history)
    }

    /// Create all services around caller-provided catalog and history collaborators
    pub fn with_collaborators(
        repository: Repository,
        repairs_config: RepairsConfig,
        catalog: catalog::CatalogService,
        history: history::HistoryService,
    ) -> Self {
        Self {
            equipment: equipment::EquipmentService::new(
                repository.clone(),
                catalog.clone(),
                history.clone(),
            ),
            installations: installations::InstallationService::new(
                repository.clone(),
                catalog.clone(),
                history.clone(),
            ),
            binding: binding::BindingService::new(repository.clone(), history.clone()),
            repairs: repairs::RepairService::new(
                repository.clone(),
                catalog.clone(),
                history.clone(),
                repairs_config,
            ),
            catalog,
            history,
            repository,
        }
    }

    /// Database connectivity check for the readiness probe
    pub async fn ping(&self) -> crate::error::AppResult<()> {
        self.repository.ping().await
    }
}
