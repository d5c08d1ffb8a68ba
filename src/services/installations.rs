//! Installation service

use chrono::Utc;
use validator::Validate;

use super::{catalog::CatalogService, history::HistoryService};
use crate::{
    error::{AppError, AppResult},
    lifecycle,
    models::{
        installation::{
            CreateInstallation, Installation, InstallationDetails, InstallationQuery,
            UpdateInstallation,
        },
        ChangeAction, ChangeSet, EntityType, Equipment, System, UserClaims,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct InstallationService {
    repository: Repository,
    catalog: CatalogService,
    history: HistoryService,
}

impl InstallationService {
    pub fn new(repository: Repository, catalog: CatalogService, history: HistoryService) -> Self {
        Self {
            repository,
            catalog,
            history,
        }
    }

    pub async fn list(
        &self,
        system: System,
        query: &InstallationQuery,
    ) -> AppResult<Vec<Installation>> {
        self.repository.installations_list(system, query).await
    }

    pub async fn get(&self, system: System, id: i64) -> AppResult<InstallationDetails> {
        let installation = self.repository.installations_get(system, id).await?;
        let equipment_count = self
            .repository
            .installations_equipment_count(system, id)
            .await?;
        Ok(InstallationDetails {
            installation,
            equipment_count,
        })
    }

    /// Equipment currently bound to the installation
    pub async fn equipment(&self, system: System, id: i64) -> AppResult<Vec<Equipment>> {
        self.repository.installations_get(system, id).await?;
        self.repository.equipment_at_installation(system, id).await
    }

    pub async fn create(
        &self,
        system: System,
        data: CreateInstallation,
        actor: &UserClaims,
    ) -> AppResult<Installation> {
        let data = data.normalized();
        data.validate()?;
        self.catalog
            .require_installation_type(system, &data.installation_type)
            .await?;

        let mut tx = self.repository.begin().await?;
        let created = self
            .repository
            .installations_insert(&mut tx, system, &data, actor.user_id)
            .await?;
        tx.commit().await?;

        tracing::info!(
            system = system.as_str(),
            installation_id = created.id,
            actor = actor.user_id,
            "Installation {} created",
            created.name
        );
        self.history.record(ChangeSet::installation(
            ChangeAction::Create,
            None,
            &created,
            actor,
        ));

        Ok(created)
    }

    pub async fn update(
        &self,
        system: System,
        id: i64,
        data: UpdateInstallation,
        actor: &UserClaims,
    ) -> AppResult<Installation> {
        let data = data.normalized();
        data.validate()?;

        // catalog lookups use the pool, so they run before the transaction holds a connection
        let mut type_checked = false;
        if let Some(code) = data.installation_type.as_deref() {
            let before = self.repository.installations_get(system, id).await?;
            if code != before.installation_type {
                self.catalog.require_installation_type(system, code).await?;
                type_checked = true;
            }
        }

        let mut tx = self.repository.begin().await?;
        let current = self.repository.installations_lock(&mut tx, system, id).await?;
        let next = current.apply_update(&data);
        if next == current {
            return Ok(current);
        }

        if next.installation_type != current.installation_type && !type_checked {
            return Err(AppError::Conflict(format!(
                "Installation {} changed while it was being edited, please retry",
                id
            )));
        }

        let saved = self.repository.installations_save(&mut tx, &next).await?;
        tx.commit().await?;

        tracing::info!(
            system = system.as_str(),
            installation_id = id,
            actor = actor.user_id,
            "Installation {} updated",
            saved.name
        );
        self.history.record(ChangeSet::installation(
            ChangeAction::Update,
            Some(&current),
            &saved,
            actor,
        ));

        Ok(saved)
    }

    /// Delete an installation. Bound equipment goes back to the warehouse with its status kept.
    pub async fn delete(&self, system: System, id: i64, actor: &UserClaims) -> AppResult<()> {
        let mut tx = self.repository.begin().await?;
        let installation = self.repository.installations_lock(&mut tx, system, id).await?;
        let bound = self
            .repository
            .equipment_lock_at_installation(&mut tx, system, id)
            .await?;

        let now = Utc::now();
        let mut released = Vec::with_capacity(bound.len());
        for current in bound {
            let mut next = current.clone();
            next.installation_id = None;
            lifecycle::stamp(&mut next, actor, now);
            let saved = self.repository.equipment_save(&mut tx, &next).await?;
            released.push((current, saved));
        }

        self.repository.installations_delete(&mut tx, system, id).await?;
        tx.commit().await?;

        tracing::info!(
            system = system.as_str(),
            installation_id = id,
            actor = actor.user_id,
            released = released.len(),
            "Installation {} deleted",
            installation.name
        );
        self.history.record_all(
            released
                .iter()
                .map(|(before, after)| {
                    ChangeSet::equipment(ChangeAction::InstallationRemoved, Some(before), after, actor)
                })
                .chain(std::iter::once(
                    ChangeSet::new(
                        EntityType::Installation,
                        id,
                        Some(system),
                        ChangeAction::Destroy,
                        actor,
                    )
                    .with_change("name", Some(installation.name.clone()), None),
                )),
        );

        Ok(())
    }
}
