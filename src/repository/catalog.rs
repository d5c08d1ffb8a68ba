//! Type catalog lookups (read-only)

use super::Repository;
use crate::{error::AppResult, models::{CatalogEntry, System}};

impl Repository {
    /// Active equipment types of a system, in display order
    pub async fn catalog_equipment_types(&self, system: System) -> AppResult<Vec<CatalogEntry>> {
        let rows = sqlx::query_as::<_, CatalogEntry>(
            r#"
            SELECT id, system, code, name, position, active FROM equipment_types
            WHERE system = $1 AND active = TRUE
            ORDER BY position, name
            "#,
        )
        .bind(system)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Active installation types of a system, in display order
    pub async fn catalog_installation_types(&self, system: System) -> AppResult<Vec<CatalogEntry>> {
        let rows = sqlx::query_as::<_, CatalogEntry>(
            r#"
            SELECT id, system, code, name, position, active FROM installation_types
            WHERE system = $1 AND active = TRUE
            ORDER BY position, name
            "#,
        )
        .bind(system)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// One equipment type by code, active or not
    pub async fn catalog_equipment_type(
        &self,
        system: System,
        code: &str,
    ) -> AppResult<Option<CatalogEntry>> {
        let row = sqlx::query_as::<_, CatalogEntry>(
            r#"
            SELECT id, system, code, name, position, active FROM equipment_types
            WHERE system = $1 AND code = $2
            "#,
        )
        .bind(system)
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// One installation type by code, active or not
    pub async fn catalog_installation_type(
        &self,
        system: System,
        code: &str,
    ) -> AppResult<Option<CatalogEntry>> {
        let row = sqlx::query_as::<_, CatalogEntry>(
            r#"
            SELECT id, system, code, name, position, active FROM installation_types
            WHERE system = $1 AND code = $2
            "#,
        )
        .bind(system)
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }
}
