//! Repair batches repository

use sqlx::PgConnection;

use super::{pagination, Repository};
use crate::{
    error::{AppError, AppResult},
    models::{
        normalize_text,
        repair::{
            NewRepairBatchItem, RepairBatch, RepairBatchItem, RepairBatchQuery,
            RepairBatchStatus, RepairCandidate, RepairCandidateQuery, RepairHistoryEntry,
            RepairHistoryQuery, RepairNumber,
        },
        EquipmentStatus, UserClaims,
    },
};

impl Repository {
    /// Highest sequence issued in `year`, if any
    pub async fn repairs_max_sequence(
        &self,
        conn: &mut PgConnection,
        year: i32,
    ) -> AppResult<Option<u32>> {
        // suffixes are zero-padded to at least three digits, so longer means larger
        let latest: Option<String> = sqlx::query_scalar(
            r#"
            SELECT repair_number FROM repair_batches
            WHERE repair_number LIKE $1
            ORDER BY length(repair_number) DESC, repair_number DESC
            LIMIT 1
            "#,
        )
        .bind(RepairNumber::year_pattern(year))
        .fetch_optional(&mut *conn)
        .await?;

        latest
            .map(|number| {
                number
                    .parse::<RepairNumber>()
                    .map(|parsed| parsed.sequence)
                    .map_err(AppError::Internal)
            })
            .transpose()
    }

    /// Insert the batch header
    pub async fn repairs_insert_batch(
        &self,
        conn: &mut PgConnection,
        repair_number: &RepairNumber,
        actor: &UserClaims,
        equipment_count: i32,
        notes: Option<&str>,
    ) -> AppResult<RepairBatch> {
        let row = sqlx::query_as::<_, RepairBatch>(
            r#"
            INSERT INTO repair_batches (repair_number, created_by, created_by_name, status, equipment_count, notes)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(repair_number.to_string())
        .bind(actor.user_id)
        .bind(&actor.username)
        .bind(RepairBatchStatus::Sent)
        .bind(equipment_count)
        .bind(notes)
        .fetch_one(&mut *conn)
        .await?;
        Ok(row)
    }

    /// Insert one snapshot item
    pub async fn repairs_insert_item(
        &self,
        conn: &mut PgConnection,
        batch_id: i64,
        item: &NewRepairBatchItem,
    ) -> AppResult<RepairBatchItem> {
        let row = sqlx::query_as::<_, RepairBatchItem>(
            r#"
            INSERT INTO repair_batch_items (
                repair_batch_id, system, equipment_id, equipment_type, equipment_type_name,
                serial_number, model, inventory_number, terminal, installation_name, note
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(batch_id)
        .bind(item.system)
        .bind(item.equipment_id)
        .bind(&item.equipment_type)
        .bind(&item.equipment_type_name)
        .bind(&item.serial_number)
        .bind(&item.model)
        .bind(&item.inventory_number)
        .bind(&item.terminal)
        .bind(&item.installation_name)
        .bind(&item.note)
        .fetch_one(&mut *conn)
        .await?;
        Ok(row)
    }

    /// List batches, newest first
    pub async fn repairs_list(&self, query: &RepairBatchQuery) -> AppResult<(Vec<RepairBatch>, i64)> {
        let (_, per_page, offset) = pagination(query.page, query.per_page);
        let where_clause = if query.status.is_some() { "WHERE status = $1" } else { "" };

        let count_q = format!("SELECT COUNT(*) FROM repair_batches {}", where_clause);
        let mut count_builder = sqlx::query_scalar::<_, i64>(&count_q);
        if let Some(status) = query.status { count_builder = count_builder.bind(status); }
        let total = count_builder.fetch_one(&self.pool).await?;

        let select_q = format!(
            "SELECT * FROM repair_batches {} ORDER BY created_at DESC, id DESC LIMIT {} OFFSET {}",
            where_clause, per_page, offset
        );
        let mut builder = sqlx::query_as::<_, RepairBatch>(&select_q);
        if let Some(status) = query.status { builder = builder.bind(status); }
        let rows = builder.fetch_all(&self.pool).await?;

        Ok((rows, total))
    }

    /// Get batch by ID
    pub async fn repairs_get(&self, id: i64) -> AppResult<RepairBatch> {
        sqlx::query_as::<_, RepairBatch>("SELECT * FROM repair_batches WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Repair batch {} not found", id)))
    }

    pub async fn repairs_lock(&self, conn: &mut PgConnection, id: i64) -> AppResult<RepairBatch> {
        sqlx::query_as::<_, RepairBatch>("SELECT * FROM repair_batches WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Repair batch {} not found", id)))
    }

    /// Items of a batch, grouped by system then model
    pub async fn repairs_items(&self, batch_id: i64) -> AppResult<Vec<RepairBatchItem>> {
        let rows = sqlx::query_as::<_, RepairBatchItem>(
            r#"
            SELECT * FROM repair_batch_items
            WHERE repair_batch_id = $1
            ORDER BY system, model NULLS LAST, id
            "#,
        )
        .bind(batch_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn repairs_update_status(
        &self,
        conn: &mut PgConnection,
        id: i64,
        status: RepairBatchStatus,
    ) -> AppResult<RepairBatch> {
        sqlx::query_as::<_, RepairBatch>(
            "UPDATE repair_batches SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(status)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Repair batch {} not found", id)))
    }

    /// Delete a batch; items go with it
    pub async fn repairs_delete(&self, conn: &mut PgConnection, id: i64) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM repair_batches WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Repair batch {} not found", id)));
        }
        Ok(())
    }

    /// Batch items matching the filters, newest first
    pub async fn repairs_history(
        &self,
        query: &RepairHistoryQuery,
    ) -> AppResult<Vec<RepairHistoryEntry>> {
        let serial = normalize_text(query.serial_number.clone());

        let mut conditions = Vec::new();
        let mut idx = 1;

        if serial.is_some() {
            conditions.push(format!("it.serial_number = ${}", idx));
            idx += 1;
        }
        if query.system.is_some() {
            conditions.push(format!("it.system = ${}", idx));
            idx += 1;
        }
        if query.date_from.is_some() {
            conditions.push(format!("it.created_at >= ${}::DATE", idx));
            idx += 1;
        }
        if query.date_to.is_some() {
            conditions.push(format!("it.created_at < ${}::DATE + INTERVAL '1 day'", idx));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let select_q = format!(
            r#"
            SELECT it.*, b.repair_number, b.status AS batch_status
            FROM repair_batch_items it
            JOIN repair_batches b ON b.id = it.repair_batch_id
            {}
            ORDER BY it.created_at DESC, it.id DESC
            "#,
            where_clause
        );
        let mut builder = sqlx::query_as::<_, RepairHistoryEntry>(&select_q);
        if let Some(ref s) = serial { builder = builder.bind(s); }
        if let Some(system) = query.system { builder = builder.bind(system); }
        if let Some(from) = query.date_from { builder = builder.bind(from); }
        if let Some(to) = query.date_to { builder = builder.bind(to); }

        let rows = builder.fetch_all(&self.pool).await?;
        Ok(rows)
    }

    /// Equipment in maintenance across all systems
    pub async fn repairs_candidates(
        &self,
        query: &RepairCandidateQuery,
    ) -> AppResult<Vec<RepairCandidate>> {
        let mut conditions = vec!["e.status = $1".to_string()];
        let mut idx = 2;

        if query.system.is_some() {
            conditions.push(format!("e.system = ${}", idx));
            idx += 1;
        }
        if query.terminal.is_some() {
            conditions.push(format!("i.terminal = ${}", idx));
            idx += 1;
        }
        if query.equipment_type.is_some() {
            conditions.push(format!("e.equipment_type = ${}", idx));
        }

        let select_q = format!(
            r#"
            SELECT e.*, i.name AS installation_name, i.terminal
            FROM equipment e
            LEFT JOIN installations i ON i.id = e.installation_id AND i.system = e.system
            WHERE {}
            ORDER BY e.last_action_date DESC NULLS LAST, e.id DESC
            "#,
            conditions.join(" AND ")
        );
        let mut builder =
            sqlx::query_as::<_, RepairCandidate>(&select_q).bind(EquipmentStatus::Maintenance);
        if let Some(system) = query.system { builder = builder.bind(system); }
        if let Some(terminal) = query.terminal { builder = builder.bind(terminal); }
        if let Some(ref t) = query.equipment_type { builder = builder.bind(t); }

        let rows = builder.fetch_all(&self.pool).await?;
        Ok(rows)
    }
}
