//! Binding engine: links warehouse equipment to installations
//!
//! Attach and detach lock the installation row first, then the equipment row,
//! and re-check availability under those locks before writing.

use chrono::Utc;

use super::{equipment::duplicate_type_error, history::HistoryService};
use crate::{
    error::{AppError, AppResult},
    lifecycle::{self, LifecycleEvent},
    models::{
        equipment::SerialSearchResult, ChangeAction, ChangeSet, Equipment, SerialLookup, System,
        UserClaims,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct BindingService {
    repository: Repository,
    history: HistoryService,
}

impl BindingService {
    pub fn new(repository: Repository, history: HistoryService) -> Self {
        Self {
            repository,
            history,
        }
    }

    /// Unbound equipment with this serial number. `Ok(None)` when nothing matches,
    /// `AlreadyBound` when only bound equipment does.
    pub async fn search_unbound_by_serial(
        &self,
        system: System,
        serial_number: &str,
    ) -> AppResult<Option<Equipment>> {
        let serial_number = serial_number.trim();
        if serial_number.is_empty() {
            return Err(AppError::Validation("Serial number is required".to_string()));
        }

        let matches = self
            .repository
            .equipment_by_serial(system, serial_number)
            .await?;

        match SerialLookup::classify(matches) {
            SerialLookup::Available(equipment) => Ok(Some(equipment)),
            SerialLookup::AlreadyBound(equipment) => Err(already_bound_error(&equipment)),
            SerialLookup::NotFound => Ok(None),
        }
    }

    /// Serial search from an installation screen, with a hint when attaching
    /// would hit the duplicate-type rule
    pub async fn search_for_installation(
        &self,
        system: System,
        installation_id: i64,
        serial_number: &str,
        actor: &UserClaims,
    ) -> AppResult<SerialSearchResult> {
        self.repository.installations_get(system, installation_id).await?;

        let equipment = self.search_unbound_by_serial(system, serial_number).await?;
        let duplicate = match &equipment {
            Some(found) if lifecycle::duplicate_type_applies(system, actor) => {
                self.repository
                    .equipment_find_same_type_at(
                        &self.repository.pool,
                        system,
                        installation_id,
                        &found.equipment_type,
                        Some(found.id),
                    )
                    .await?
            }
            _ => None,
        };

        Ok(SerialSearchResult {
            equipment,
            duplicate,
        })
    }

    /// Bind unbound equipment to an installation; status becomes `active`
    pub async fn attach(
        &self,
        system: System,
        installation_id: i64,
        equipment_id: i64,
        actor: &UserClaims,
    ) -> AppResult<Equipment> {
        let mut tx = self.repository.begin().await?;

        self.repository
            .installations_lock(&mut tx, system, installation_id)
            .await?;
        let current = self
            .repository
            .equipment_lock(&mut tx, system, equipment_id)
            .await?;

        if current.is_bound() {
            return Err(already_bound_error(&current));
        }

        if lifecycle::duplicate_type_applies(system, actor) {
            if let Some(existing) = self
                .repository
                .equipment_find_same_type_at(
                    &mut *tx,
                    system,
                    installation_id,
                    &current.equipment_type,
                    Some(equipment_id),
                )
                .await?
            {
                return Err(duplicate_type_error(system, installation_id, &existing));
            }
        }

        let mut next = current.clone();
        next.installation_id = Some(installation_id);
        lifecycle::apply(&mut next, LifecycleEvent::Attached);
        lifecycle::stamp(&mut next, actor, Utc::now());

        let saved = self.repository.equipment_save(&mut tx, &next).await?;
        tx.commit().await?;

        tracing::info!(
            system = system.as_str(),
            installation_id,
            equipment_id,
            actor = actor.user_id,
            privileged = actor.is_privileged(),
            "Equipment attached"
        );
        self.history.record(ChangeSet::equipment(
            ChangeAction::Attach,
            Some(&current),
            &saved,
            actor,
        ));

        Ok(saved)
    }

    /// Unbind equipment from the installation it belongs to; status becomes `ready_to_dispatch`
    pub async fn detach(
        &self,
        system: System,
        installation_id: i64,
        equipment_id: i64,
        actor: &UserClaims,
    ) -> AppResult<Equipment> {
        let mut tx = self.repository.begin().await?;

        self.repository
            .installations_lock(&mut tx, system, installation_id)
            .await?;
        let current = self
            .repository
            .equipment_lock(&mut tx, system, equipment_id)
            .await?;

        if current.installation_id != Some(installation_id) {
            return Err(AppError::NotFound(format!(
                "{} equipment {} is not bound to installation {}",
                system, equipment_id, installation_id
            )));
        }

        let mut next = current.clone();
        next.installation_id = None;
        lifecycle::apply(&mut next, LifecycleEvent::Detached);
        lifecycle::stamp(&mut next, actor, Utc::now());

        let saved = self.repository.equipment_save(&mut tx, &next).await?;
        tx.commit().await?;

        tracing::info!(
            system = system.as_str(),
            installation_id,
            equipment_id,
            actor = actor.user_id,
            "Equipment detached"
        );
        self.history.record(ChangeSet::equipment(
            ChangeAction::Detach,
            Some(&current),
            &saved,
            actor,
        ));

        Ok(saved)
    }
}

fn already_bound_error(equipment: &Equipment) -> AppError {
    AppError::AlreadyBound(format!(
        "{} equipment {} ({}) is already bound to installation {}",
        equipment.system,
        equipment.id,
        equipment.inventory_number,
        equipment
            .installation_id
            .map(|id| id.to_string())
            .unwrap_or_default()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::equipment::tests::equipment;

    #[test]
    fn test_already_bound_message_points_at_installation() {
        match already_bound_error(&equipment(3, Some(12))) {
            AppError::AlreadyBound(msg) => assert!(msg.ends_with("installation 12")),
            other => panic!("unexpected error {:?}", other),
        }
    }
}
