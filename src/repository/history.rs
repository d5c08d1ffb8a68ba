//! Change history storage

use sqlx::types::Json;

use super::Repository;
use crate::{error::AppResult, models::ChangeSet};

impl Repository {
    /// Append one change set; a replayed `change_id` is ignored
    pub async fn history_insert(&self, change: &ChangeSet) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO change_history (
                change_id, entity_type, entity_id, system, action,
                actor_id, actor_name, changes, recorded_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (change_id) DO NOTHING
            "#,
        )
        .bind(change.change_id)
        .bind(change.entity_type.as_str())
        .bind(change.entity_id)
        .bind(change.system)
        .bind(change.action.as_str())
        .bind(change.actor_id)
        .bind(&change.actor_name)
        .bind(Json(&change.changes))
        .bind(change.recorded_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
