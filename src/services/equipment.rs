//! Equipment service: manual CRUD and field uniqueness

use chrono::Utc;
use sqlx::PgConnection;
use validator::Validate;

use super::{catalog::CatalogService, history::HistoryService};
use crate::{
    error::{AppError, AppResult},
    lifecycle,
    models::{
        equipment::{
            CreateEquipment, DuplicateCheck, DuplicateQuery, Equipment, EquipmentList,
            EquipmentQuery, EquipmentStatus, UpdateEquipment,
        },
        ChangeAction, ChangeSet, EntityType, System, UserClaims,
    },
    repository::{pagination, Repository},
};

#[derive(Clone)]
pub struct EquipmentService {
    repository: Repository,
    catalog: CatalogService,
    history: HistoryService,
}

impl EquipmentService {
    pub fn new(repository: Repository, catalog: CatalogService, history: HistoryService) -> Self {
        Self {
            repository,
            catalog,
            history,
        }
    }

    pub async fn list(&self, system: System, query: &EquipmentQuery) -> AppResult<EquipmentList> {
        let (page, per_page, _) = pagination(query.page, query.per_page);
        let (items, total) = self.repository.equipment_list(system, query).await?;
        Ok(EquipmentList {
            items,
            total,
            page,
            per_page,
        })
    }

    pub async fn get(&self, system: System, id: i64) -> AppResult<Equipment> {
        self.repository.equipment_get(system, id).await
    }

    /// Create equipment, optionally bound to an installation right away
    pub async fn create(
        &self,
        system: System,
        data: CreateEquipment,
        actor: &UserClaims,
    ) -> AppResult<Equipment> {
        let data = data.normalized();
        data.validate()?;

        self.catalog
            .require_equipment_type(system, &data.equipment_type)
            .await?;
        check_serial_presence(system, data.serial_number.as_deref())?;

        let mut tx = self.repository.begin().await?;

        if let Some(installation_id) = data.installation_id {
            self.lock_target_installation(&mut tx, system, installation_id)
                .await?;
            if data.status != Some(EquipmentStatus::Decommissioned) {
                self.ensure_no_duplicate(
                    &mut tx,
                    system,
                    installation_id,
                    &data.equipment_type,
                    None,
                    actor,
                )
                .await?;
            }
        }

        self.ensure_unique_fields(
            &mut tx,
            system,
            &data.inventory_number,
            data.serial_number.as_deref(),
            None,
        )
        .await?;

        let created = self
            .repository
            .equipment_insert(&mut tx, system, &data, actor.user_id, Utc::now())
            .await?;
        tx.commit().await?;

        tracing::info!(
            system = system.as_str(),
            equipment_id = created.id,
            actor = actor.user_id,
            "Equipment {} created",
            created.inventory_number
        );
        self.history
            .record(ChangeSet::equipment(ChangeAction::Create, None, &created, actor));

        Ok(created)
    }

    /// Manual edit. Any status may be set; binding changes get the same checks as attach
    /// but no automatic status change.
    pub async fn update(
        &self,
        system: System,
        id: i64,
        data: UpdateEquipment,
        actor: &UserClaims,
    ) -> AppResult<Equipment> {
        let data = data.normalized();
        data.validate()?;

        // Unlocked read: the catalog lookup needs its own pool connection, and the
        // installation to lock must be known before the equipment row is locked.
        let before = self.repository.equipment_get(system, id).await?;
        let requested_type = data
            .equipment_type
            .as_deref()
            .filter(|code| *code != before.equipment_type);
        if let Some(code) = requested_type {
            self.catalog.require_equipment_type(system, code).await?;
        }
        let target_installation = match data.installation_id {
            Some(target) => target,
            None => before.installation_id,
        };

        let mut tx = self.repository.begin().await?;

        // installation before equipment, same order as attach
        if let Some(installation_id) = target_installation {
            self.lock_target_installation(&mut tx, system, installation_id)
                .await?;
        }

        let current = self.repository.equipment_lock(&mut tx, system, id).await?;
        let mut next = current.apply_update(&data);

        if next == current {
            return Ok(current);
        }

        let moved_meanwhile =
            data.installation_id.is_none() && current.installation_id != before.installation_id;
        let unchecked_type =
            next.equipment_type != current.equipment_type && requested_type.is_none();
        if moved_meanwhile || unchecked_type {
            return Err(AppError::Conflict(format!(
                "{} equipment {} changed while it was being edited, please retry",
                system, id
            )));
        }
        check_serial_presence(system, next.serial_number.as_deref())?;

        let rebinding = next.installation_id != current.installation_id
            || next.equipment_type != current.equipment_type
            || current.status == EquipmentStatus::Decommissioned;
        if let Some(installation_id) = next.installation_id {
            if rebinding && next.status != EquipmentStatus::Decommissioned {
                self.ensure_no_duplicate(
                    &mut tx,
                    system,
                    installation_id,
                    &next.equipment_type,
                    Some(id),
                    actor,
                )
                .await?;
            }
        }

        self.ensure_unique_fields(
            &mut tx,
            system,
            &next.inventory_number,
            next.serial_number
                .as_deref()
                .filter(|s| Some(*s) != current.serial_number.as_deref()),
            Some(id),
        )
        .await?;

        lifecycle::stamp(&mut next, actor, Utc::now());
        let saved = self.repository.equipment_save(&mut tx, &next).await?;
        tx.commit().await?;

        tracing::info!(
            system = system.as_str(),
            equipment_id = id,
            actor = actor.user_id,
            "Equipment {} updated",
            saved.inventory_number
        );
        self.history.record(ChangeSet::equipment(
            ChangeAction::Update,
            Some(&current),
            &saved,
            actor,
        ));

        Ok(saved)
    }

    pub async fn delete(&self, system: System, id: i64, actor: &UserClaims) -> AppResult<()> {
        let mut tx = self.repository.begin().await?;
        let current = self.repository.equipment_lock(&mut tx, system, id).await?;
        self.repository.equipment_delete(&mut tx, system, id).await?;
        tx.commit().await?;

        tracing::info!(
            system = system.as_str(),
            equipment_id = id,
            actor = actor.user_id,
            "Equipment {} deleted",
            current.inventory_number
        );
        self.history.record(
            ChangeSet::new(EntityType::Equipment, id, Some(system), ChangeAction::Destroy, actor)
                .with_change("inventory_number", Some(current.inventory_number), None)
                .with_change("installation_id", current.installation_id, None),
        );

        Ok(())
    }

    /// Existing non-decommissioned equipment of a type at an installation
    pub async fn check_duplicate(
        &self,
        system: System,
        query: &DuplicateQuery,
    ) -> AppResult<DuplicateCheck> {
        let existing = self
            .repository
            .equipment_find_same_type_at(
                &self.repository.pool,
                system,
                query.installation_id,
                query.equipment_type.trim(),
                query.exclude_id,
            )
            .await?;
        Ok(DuplicateCheck {
            duplicate: existing.is_some(),
            equipment: existing,
        })
    }

    async fn lock_target_installation(
        &self,
        conn: &mut PgConnection,
        system: System,
        installation_id: i64,
    ) -> AppResult<()> {
        match self
            .repository
            .installations_lock(conn, system, installation_id)
            .await
        {
            Ok(_) => Ok(()),
            Err(AppError::NotFound(_)) => Err(AppError::Validation(format!(
                "Installation {} does not exist in {}",
                installation_id, system
            ))),
            Err(e) => Err(e),
        }
    }

    async fn ensure_no_duplicate(
        &self,
        conn: &mut PgConnection,
        system: System,
        installation_id: i64,
        equipment_type: &str,
        exclude_id: Option<i64>,
        actor: &UserClaims,
    ) -> AppResult<()> {
        if !lifecycle::duplicate_type_applies(system, actor) {
            return Ok(());
        }
        let existing = self
            .repository
            .equipment_find_same_type_at(conn, system, installation_id, equipment_type, exclude_id)
            .await?;
        match existing {
            Some(other) => Err(duplicate_type_error(system, installation_id, &other)),
            None => Ok(()),
        }
    }

    /// Uniqueness pre-check so the caller gets a field message before any write
    async fn ensure_unique_fields(
        &self,
        conn: &mut PgConnection,
        system: System,
        inventory_number: &str,
        serial_number: Option<&str>,
        exclude_id: Option<i64>,
    ) -> AppResult<()> {
        if self
            .repository
            .equipment_inventory_taken(&mut *conn, system, inventory_number, exclude_id)
            .await?
        {
            return Err(AppError::Validation(format!(
                "Inventory number {} already exists in {}",
                inventory_number, system
            )));
        }

        if let Some(serial) = serial_number {
            if system.policy().serial_unique
                && self
                    .repository
                    .equipment_serial_taken(&mut *conn, system, serial, exclude_id)
                    .await?
            {
                return Err(AppError::Validation(format!(
                    "Serial number {} already exists in {}",
                    serial, system
                )));
            }
        }
        Ok(())
    }
}

pub(crate) fn check_serial_presence(system: System, serial_number: Option<&str>) -> AppResult<()> {
    if system.policy().serial_required && serial_number.is_none() {
        return Err(AppError::Validation(format!(
            "Serial number is required for {} equipment",
            system
        )));
    }
    Ok(())
}

pub(crate) fn duplicate_type_error(system: System, installation_id: i64, existing: &Equipment) -> AppError {
    AppError::DuplicateType(format!(
        "Installation {} in {} already has {} equipment {} ({})",
        installation_id, system, existing.equipment_type, existing.id, existing.inventory_number
    ))
}
