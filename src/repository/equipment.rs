//! Equipment domain methods on Repository

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgExecutor};

use super::{pagination, Repository};
use crate::{
    error::{AppError, AppResult},
    models::{
        equipment::{CreateEquipment, Equipment, EquipmentQuery, EquipmentStatus},
        normalize_text, System,
    },
};

impl Repository {
    /// List equipment of one system with optional filters and pagination
    pub async fn equipment_list(
        &self,
        system: System,
        query: &EquipmentQuery,
    ) -> AppResult<(Vec<Equipment>, i64)> {
        let (_, per_page, offset) = pagination(query.page, query.per_page);
        let search = normalize_text(query.search.clone()).map(|s| format!("%{}%", s));

        let mut conditions = vec!["system = $1".to_string()];
        let mut idx = 2;

        if query.status.is_some() {
            conditions.push(format!("status = ${}", idx));
            idx += 1;
        }
        if query.equipment_type.is_some() {
            conditions.push(format!("equipment_type = ${}", idx));
            idx += 1;
        }
        if query.installation_id.is_some() {
            conditions.push(format!("installation_id = ${}", idx));
            idx += 1;
        }
        if query.terminal.is_some() {
            conditions.push(format!(
                "installation_id IN (SELECT id FROM installations WHERE system = $1 AND terminal = ${})",
                idx
            ));
            idx += 1;
        }
        if search.is_some() {
            conditions.push(format!(
                "(model ILIKE ${0} OR inventory_number ILIKE ${0} OR serial_number ILIKE ${0})",
                idx
            ));
        }
        match query.unassigned {
            Some(true) => conditions.push("installation_id IS NULL".to_string()),
            Some(false) => conditions.push("installation_id IS NOT NULL".to_string()),
            None => {}
        }

        let where_clause = conditions.join(" AND ");

        macro_rules! bind_filters {
            ($builder:ident) => {
                $builder = $builder.bind(system);
                if let Some(status) = query.status { $builder = $builder.bind(status); }
                if let Some(ref t) = query.equipment_type { $builder = $builder.bind(t); }
                if let Some(id) = query.installation_id { $builder = $builder.bind(id); }
                if let Some(terminal) = query.terminal { $builder = $builder.bind(terminal); }
                if let Some(ref s) = search { $builder = $builder.bind(s); }
            };
        }

        let count_q = format!("SELECT COUNT(*) FROM equipment WHERE {}", where_clause);
        let mut count_builder = sqlx::query_scalar::<_, i64>(&count_q);
        bind_filters!(count_builder);
        let total = count_builder.fetch_one(&self.pool).await?;

        let select_q = format!(
            "SELECT * FROM equipment WHERE {} \
             ORDER BY last_action_date DESC NULLS LAST, created_at DESC LIMIT {} OFFSET {}",
            where_clause, per_page, offset
        );
        let mut builder = sqlx::query_as::<_, Equipment>(&select_q);
        bind_filters!(builder);
        let rows = builder.fetch_all(&self.pool).await?;

        Ok((rows, total))
    }

    /// Get equipment by ID within a system
    pub async fn equipment_get(&self, system: System, id: i64) -> AppResult<Equipment> {
        sqlx::query_as::<_, Equipment>("SELECT * FROM equipment WHERE system = $1 AND id = $2")
            .bind(system)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("{} equipment {} not found", system, id)))
    }

    /// Lock an equipment row for the rest of the transaction
    pub async fn equipment_lock(
        &self,
        conn: &mut PgConnection,
        system: System,
        id: i64,
    ) -> AppResult<Equipment> {
        sqlx::query_as::<_, Equipment>(
            "SELECT * FROM equipment WHERE system = $1 AND id = $2 FOR UPDATE",
        )
        .bind(system)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{} equipment {} not found", system, id)))
    }

    /// Lock every item bound to an installation, ordered by id
    pub async fn equipment_lock_at_installation(
        &self,
        conn: &mut PgConnection,
        system: System,
        installation_id: i64,
    ) -> AppResult<Vec<Equipment>> {
        let rows = sqlx::query_as::<_, Equipment>(
            r#"
            SELECT * FROM equipment
            WHERE system = $1 AND installation_id = $2
            ORDER BY id
            FOR UPDATE
            "#,
        )
        .bind(system)
        .bind(installation_id)
        .fetch_all(&mut *conn)
        .await?;
        Ok(rows)
    }

    /// Equipment bound to an installation
    pub async fn equipment_at_installation(
        &self,
        system: System,
        installation_id: i64,
    ) -> AppResult<Vec<Equipment>> {
        let rows = sqlx::query_as::<_, Equipment>(
            r#"
            SELECT * FROM equipment
            WHERE system = $1 AND installation_id = $2
            ORDER BY equipment_type, inventory_number
            "#,
        )
        .bind(system)
        .bind(installation_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// All equipment carrying a serial number, bound or not
    pub async fn equipment_by_serial(
        &self,
        system: System,
        serial_number: &str,
    ) -> AppResult<Vec<Equipment>> {
        let rows = sqlx::query_as::<_, Equipment>(
            "SELECT * FROM equipment WHERE system = $1 AND serial_number = $2 ORDER BY id",
        )
        .bind(system)
        .bind(serial_number)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Non-decommissioned equipment of a type at an installation
    pub async fn equipment_find_same_type_at<'e, E: PgExecutor<'e>>(
        &self,
        executor: E,
        system: System,
        installation_id: i64,
        equipment_type: &str,
        exclude_id: Option<i64>,
    ) -> AppResult<Option<Equipment>> {
        let row = sqlx::query_as::<_, Equipment>(
            r#"
            SELECT * FROM equipment
            WHERE system = $1
              AND installation_id = $2
              AND equipment_type = $3
              AND status <> $4
              AND ($5::BIGINT IS NULL OR id <> $5)
            ORDER BY id
            LIMIT 1
            "#,
        )
        .bind(system)
        .bind(installation_id)
        .bind(equipment_type)
        .bind(EquipmentStatus::Decommissioned)
        .bind(exclude_id)
        .fetch_optional(executor)
        .await?;
        Ok(row)
    }

    /// Whether another row of the system already uses this inventory number
    pub async fn equipment_inventory_taken<'e, E: PgExecutor<'e>>(
        &self,
        executor: E,
        system: System,
        inventory_number: &str,
        exclude_id: Option<i64>,
    ) -> AppResult<bool> {
        let taken: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM equipment
                WHERE system = $1 AND inventory_number = $2
                  AND ($3::BIGINT IS NULL OR id <> $3)
            )
            "#,
        )
        .bind(system)
        .bind(inventory_number)
        .bind(exclude_id)
        .fetch_one(executor)
        .await?;
        Ok(taken)
    }

    /// Whether another row of the system already uses this serial number
    pub async fn equipment_serial_taken<'e, E: PgExecutor<'e>>(
        &self,
        executor: E,
        system: System,
        serial_number: &str,
        exclude_id: Option<i64>,
    ) -> AppResult<bool> {
        let taken: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM equipment
                WHERE system = $1 AND serial_number = $2
                  AND ($3::BIGINT IS NULL OR id <> $3)
            )
            "#,
        )
        .bind(system)
        .bind(serial_number)
        .bind(exclude_id)
        .fetch_one(executor)
        .await?;
        Ok(taken)
    }

    /// Insert equipment
    pub async fn equipment_insert(
        &self,
        conn: &mut PgConnection,
        system: System,
        data: &CreateEquipment,
        owner_id: i64,
        now: DateTime<Utc>,
    ) -> AppResult<Equipment> {
        let row = sqlx::query_as::<_, Equipment>(
            r#"
            INSERT INTO equipment (
                system, installation_id, equipment_type, model, inventory_number,
                serial_number, status, note, owner_id, last_changed_by,
                last_action_date, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9, $10, $10, $10)
            RETURNING *
            "#,
        )
        .bind(system)
        .bind(data.installation_id)
        .bind(&data.equipment_type)
        .bind(&data.model)
        .bind(&data.inventory_number)
        .bind(&data.serial_number)
        .bind(data.status.unwrap_or_default())
        .bind(&data.note)
        .bind(owner_id)
        .bind(now)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| AppError::from(e).classify_constraint())?;
        Ok(row)
    }

    /// Persist every mutable field of an equipment row
    pub async fn equipment_save(
        &self,
        conn: &mut PgConnection,
        equipment: &Equipment,
    ) -> AppResult<Equipment> {
        sqlx::query_as::<_, Equipment>(
            r#"
            UPDATE equipment SET
                installation_id = $3,
                equipment_type = $4,
                model = $5,
                inventory_number = $6,
                serial_number = $7,
                status = $8,
                note = $9,
                repair_ticket_number = $10,
                last_changed_by = $11,
                last_action_date = $12,
                updated_at = NOW()
            WHERE system = $1 AND id = $2
            RETURNING *
            "#,
        )
        .bind(equipment.system)
        .bind(equipment.id)
        .bind(equipment.installation_id)
        .bind(&equipment.equipment_type)
        .bind(&equipment.model)
        .bind(&equipment.inventory_number)
        .bind(&equipment.serial_number)
        .bind(equipment.status)
        .bind(&equipment.note)
        .bind(&equipment.repair_ticket_number)
        .bind(equipment.last_changed_by)
        .bind(equipment.last_action_date)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| AppError::from(e).classify_constraint())?
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "{} equipment {} not found",
                equipment.system, equipment.id
            ))
        })
    }

    /// Delete equipment
    pub async fn equipment_delete(
        &self,
        conn: &mut PgConnection,
        system: System,
        id: i64,
    ) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM equipment WHERE system = $1 AND id = $2")
            .bind(system)
            .bind(id)
            .execute(&mut *conn)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("{} equipment {} not found", system, id)));
        }
        Ok(())
    }
}
