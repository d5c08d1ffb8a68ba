//! Repair batch workflow
//!
//! A batch is created in one transaction: every selected equipment row is
//! locked in `(system, id)` order, the next repair number is taken, snapshot
//! items are written and each item moves to `waiting_repair`. Any failure
//! rolls the whole batch back.

use std::collections::HashMap;

use chrono::{Datelike, Utc};
use validator::Validate;

use super::{catalog::CatalogService, history::HistoryService};
use crate::{
    config::RepairsConfig,
    error::{AppError, AppResult},
    lifecycle::{self, LifecycleEvent},
    models::{
        normalize_text,
        repair::{
            CreateRepairBatch, CreatedRepairBatch, NewRepairBatchItem, RepairBatchDetails,
            RepairBatchList, RepairBatchQuery, RepairBatchStatus, RepairCandidate,
            RepairCandidateQuery, RepairHistory, RepairHistoryQuery, RepairNumber,
        },
        ChangeAction, ChangeSet, EntityType, Equipment, EquipmentRef, System, UserClaims,
    },
    repository::{pagination, Repository},
};

const REPAIR_NUMBER_CONSTRAINT: &str = "repair_batches_repair_number_key";

/// Catalog display name per `(system, equipment type)` of a selection
type TypeNames = HashMap<(System, String), Option<String>>;

#[derive(Clone)]
pub struct RepairService {
    repository: Repository,
    catalog: CatalogService,
    history: HistoryService,
    config: RepairsConfig,
}

impl RepairService {
    pub fn new(
        repository: Repository,
        catalog: CatalogService,
        history: HistoryService,
        config: RepairsConfig,
    ) -> Self {
        Self {
            repository,
            catalog,
            history,
            config,
        }
    }

    /// Create a batch from a selection that may mix systems
    pub async fn create_batch(
        &self,
        data: CreateRepairBatch,
        actor: &UserClaims,
    ) -> AppResult<CreatedRepairBatch> {
        data.validate()?;
        let selection = normalize_selection(&data.items)?;
        let notes = normalize_text(data.notes);
        let attempts = self.config.number_retry_limit.max(1);
        let type_names = self.resolve_type_names(&selection).await?;

        let mut attempt = 1;
        loop {
            match self
                .try_create_batch(&selection, &type_names, notes.as_deref(), actor)
                .await
            {
                Ok(created) => return Ok(created),
                Err(e) if e.is_unique_violation(REPAIR_NUMBER_CONSTRAINT) => {
                    if attempt >= attempts {
                        tracing::warn!(attempts, "Repair number retries exhausted");
                        return Err(AppError::Conflict(
                            "Another repair batch took the same number, please retry".to_string(),
                        ));
                    }
                    tracing::warn!(attempt, "Repair number collision, retrying batch creation");
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Snapshot type names, read before any row is locked so the transaction
    /// never waits on a second pool connection
    async fn resolve_type_names(&self, selection: &[EquipmentRef]) -> AppResult<TypeNames> {
        let mut names = TypeNames::new();
        for reference in selection {
            let equipment = match self
                .repository
                .equipment_get(reference.system, reference.id)
                .await
            {
                Ok(equipment) => equipment,
                Err(AppError::NotFound(_)) => {
                    return Err(AppError::Validation(format!("{} does not exist", reference)))
                }
                Err(e) => return Err(e),
            };
            let key = (equipment.system, equipment.equipment_type);
            if !names.contains_key(&key) {
                let name = self.catalog.equipment_type_name(key.0, &key.1).await?;
                names.insert(key, name);
            }
        }
        Ok(names)
    }

    async fn try_create_batch(
        &self,
        selection: &[EquipmentRef],
        type_names: &TypeNames,
        notes: Option<&str>,
        actor: &UserClaims,
    ) -> AppResult<CreatedRepairBatch> {
        let mut tx = self.repository.begin().await?;

        let mut locked: Vec<Equipment> = Vec::with_capacity(selection.len());
        for reference in selection {
            let equipment = match self
                .repository
                .equipment_lock(&mut tx, reference.system, reference.id)
                .await
            {
                Ok(equipment) => equipment,
                Err(AppError::NotFound(_)) => {
                    return Err(AppError::Validation(format!("{} does not exist", reference)))
                }
                Err(e) => return Err(e),
            };
            lifecycle::check_enrollment(&equipment, self.config.allow_reenrollment)?;
            locked.push(equipment);
        }

        let year = Utc::now().year();
        let highest = self.repository.repairs_max_sequence(&mut tx, year).await?;
        let repair_number = RepairNumber::next_after(year, highest);

        let equipment_count = i32::try_from(locked.len())
            .map_err(|_| AppError::Validation("Too many equipment items".to_string()))?;
        let batch = self
            .repository
            .repairs_insert_batch(&mut tx, &repair_number, actor, equipment_count, notes)
            .await?;

        let now = Utc::now();
        let mut enrolled = Vec::with_capacity(locked.len());
        for current in locked {
            let installation = match current.installation_id {
                Some(installation_id) => {
                    self.repository
                        .installations_find(&mut tx, current.system, installation_id)
                        .await?
                }
                None => None,
            };
            let type_name = type_names
                .get(&(current.system, current.equipment_type.clone()))
                .cloned()
                .ok_or_else(|| {
                    AppError::Conflict(format!(
                        "{} equipment {} changed while the batch was being created, please retry",
                        current.system, current.id
                    ))
                })?;

            let item = NewRepairBatchItem::snapshot(&current, installation.as_ref(), type_name);
            self.repository
                .repairs_insert_item(&mut tx, batch.id, &item)
                .await?;

            let mut next = current.clone();
            lifecycle::apply(&mut next, LifecycleEvent::EnrolledInRepair);
            next.repair_ticket_number = Some(batch.repair_number.clone());
            lifecycle::stamp(&mut next, actor, now);
            let saved = self.repository.equipment_save(&mut tx, &next).await?;
            enrolled.push((current, saved));
        }

        tx.commit().await?;

        tracing::info!(
            batch_id = batch.id,
            repair_number = %batch.repair_number,
            equipment_count = batch.equipment_count,
            actor = actor.user_id,
            "Repair batch created"
        );

        let batch_change = ChangeSet::new(
            EntityType::RepairBatch,
            batch.id,
            None,
            ChangeAction::BatchCreated,
            actor,
        )
        .with_change("repair_number", None, Some(batch.repair_number.clone()))
        .with_change("equipment_count", None, Some(batch.equipment_count));
        self.history.record_all(
            std::iter::once(batch_change).chain(enrolled.iter().map(|(before, after)| {
                ChangeSet::equipment(ChangeAction::RepairEnrollment, Some(before), after, actor)
            })),
        );

        Ok(CreatedRepairBatch {
            id: batch.id,
            repair_number: batch.repair_number,
            equipment_count: batch.equipment_count,
        })
    }

    pub async fn list(&self, query: &RepairBatchQuery) -> AppResult<RepairBatchList> {
        let (page, per_page, _) = pagination(query.page, query.per_page);
        let (batches, total) = self.repository.repairs_list(query).await?;
        Ok(RepairBatchList {
            batches,
            total,
            page,
            per_page,
        })
    }

    pub async fn get(&self, id: i64) -> AppResult<RepairBatchDetails> {
        let batch = self.repository.repairs_get(id).await?;
        let items = self.repository.repairs_items(id).await?;
        Ok(RepairBatchDetails { batch, items })
    }

    /// Move a batch forward through sent, in_progress, received, closed
    pub async fn update_status(
        &self,
        id: i64,
        status: RepairBatchStatus,
        actor: &UserClaims,
    ) -> AppResult<RepairBatchDetails> {
        let mut tx = self.repository.begin().await?;
        let current = self.repository.repairs_lock(&mut tx, id).await?;

        if current.status == status {
            drop(tx);
            return self.get(id).await;
        }
        if !current.status.can_advance_to(status) {
            return Err(AppError::Validation(format!(
                "Repair batch {} cannot go back from {} to {}",
                current.repair_number,
                current.status.as_str(),
                status.as_str()
            )));
        }

        let updated = self
            .repository
            .repairs_update_status(&mut tx, id, status)
            .await?;
        tx.commit().await?;

        tracing::info!(
            batch_id = id,
            repair_number = %updated.repair_number,
            from = current.status.as_str(),
            to = status.as_str(),
            actor = actor.user_id,
            "Repair batch status changed"
        );
        self.history.record(
            ChangeSet::new(
                EntityType::RepairBatch,
                id,
                None,
                ChangeAction::BatchStatusChanged,
                actor,
            )
            .with_change("status", current.status.as_str(), status.as_str()),
        );

        self.get(id).await
    }

    /// Delete a batch with its items. Equipment is left as it is.
    pub async fn delete(&self, id: i64, actor: &UserClaims) -> AppResult<()> {
        let mut tx = self.repository.begin().await?;
        let batch = self.repository.repairs_lock(&mut tx, id).await?;
        self.repository.repairs_delete(&mut tx, id).await?;
        tx.commit().await?;

        tracing::info!(
            batch_id = id,
            repair_number = %batch.repair_number,
            actor = actor.user_id,
            "Repair batch deleted"
        );
        self.history.record(
            ChangeSet::new(
                EntityType::RepairBatch,
                id,
                None,
                ChangeAction::BatchDestroyed,
                actor,
            )
            .with_change("repair_number", Some(batch.repair_number), None),
        );

        Ok(())
    }

    /// Past repairs matching the filters, newest first. No match is an empty result.
    pub async fn history(&self, query: &RepairHistoryQuery) -> AppResult<RepairHistory> {
        let entries = self.repository.repairs_history(query).await?;
        Ok(RepairHistory::from_entries(
            normalize_text(query.serial_number.clone()),
            entries,
        ))
    }

    /// Equipment in maintenance, the usual pool for a new batch
    pub async fn candidates(&self, query: &RepairCandidateQuery) -> AppResult<Vec<RepairCandidate>> {
        self.repository.repairs_candidates(query).await
    }
}

/// Reject empty or repeated selections; returns the references in lock order
pub(crate) fn normalize_selection(items: &[EquipmentRef]) -> AppResult<Vec<EquipmentRef>> {
    if items.is_empty() {
        return Err(AppError::Validation(
            "Select at least one equipment item".to_string(),
        ));
    }

    let mut sorted = items.to_vec();
    sorted.sort();
    if let Some(pair) = sorted.windows(2).find(|pair| pair[0] == pair[1]) {
        return Err(AppError::Validation(format!(
            "{} is selected more than once",
            pair[0]
        )));
    }
    Ok(sorted)
}
