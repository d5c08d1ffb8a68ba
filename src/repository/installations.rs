//! Installations repository

use sqlx::PgConnection;

use super::Repository;
use crate::{
    error::{AppError, AppResult},
    models::{
        installation::{CreateInstallation, Installation, InstallationQuery},
        normalize_text, System,
    },
};

impl Repository {
    /// List installations of one system, ordered by name
    pub async fn installations_list(
        &self,
        system: System,
        query: &InstallationQuery,
    ) -> AppResult<Vec<Installation>> {
        let search = normalize_text(query.search.clone()).map(|s| format!("%{}%", s));

        let mut conditions = vec!["system = $1".to_string()];
        let mut idx = 2;

        if query.terminal.is_some() {
            conditions.push(format!("terminal = ${}", idx));
            idx += 1;
        }
        if query.installation_type.is_some() {
            conditions.push(format!("installation_type = ${}", idx));
            idx += 1;
        }
        if search.is_some() {
            conditions.push(format!("name ILIKE ${}", idx));
        }

        let select_q = format!(
            "SELECT * FROM installations WHERE {} ORDER BY name, id",
            conditions.join(" AND ")
        );
        let mut builder = sqlx::query_as::<_, Installation>(&select_q).bind(system);
        if let Some(terminal) = query.terminal { builder = builder.bind(terminal); }
        if let Some(ref t) = query.installation_type { builder = builder.bind(t); }
        if let Some(ref s) = search { builder = builder.bind(s); }

        let rows = builder.fetch_all(&self.pool).await?;
        Ok(rows)
    }

    /// Get installation by ID within a system
    pub async fn installations_get(&self, system: System, id: i64) -> AppResult<Installation> {
        sqlx::query_as::<_, Installation>(
            "SELECT * FROM installations WHERE system = $1 AND id = $2",
        )
        .bind(system)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{} installation {} not found", system, id)))
    }

    /// Look up an installation inside a transaction without locking it
    pub async fn installations_find(
        &self,
        conn: &mut PgConnection,
        system: System,
        id: i64,
    ) -> AppResult<Option<Installation>> {
        let row = sqlx::query_as::<_, Installation>(
            "SELECT * FROM installations WHERE system = $1 AND id = $2",
        )
        .bind(system)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
        Ok(row)
    }

    /// Lock an installation row; serializes attaches to the same site
    pub async fn installations_lock(
        &self,
        conn: &mut PgConnection,
        system: System,
        id: i64,
    ) -> AppResult<Installation> {
        sqlx::query_as::<_, Installation>(
            "SELECT * FROM installations WHERE system = $1 AND id = $2 FOR UPDATE",
        )
        .bind(system)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{} installation {} not found", system, id)))
    }

    /// Number of equipment items bound to an installation
    pub async fn installations_equipment_count(&self, system: System, id: i64) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM equipment WHERE system = $1 AND installation_id = $2",
        )
        .bind(system)
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    /// Insert an installation
    pub async fn installations_insert(
        &self,
        conn: &mut PgConnection,
        system: System,
        data: &CreateInstallation,
        owner_id: i64,
    ) -> AppResult<Installation> {
        let row = sqlx::query_as::<_, Installation>(
            r#"
            INSERT INTO installations (system, name, installation_type, terminal, identifier, owner_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(system)
        .bind(&data.name)
        .bind(&data.installation_type)
        .bind(data.terminal)
        .bind(&data.identifier)
        .bind(owner_id)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| AppError::from(e).classify_constraint())?;
        Ok(row)
    }

    /// Persist every mutable field of an installation
    pub async fn installations_save(
        &self,
        conn: &mut PgConnection,
        installation: &Installation,
    ) -> AppResult<Installation> {
        sqlx::query_as::<_, Installation>(
            r#"
            UPDATE installations SET
                name = $3,
                installation_type = $4,
                terminal = $5,
                identifier = $6,
                updated_at = NOW()
            WHERE system = $1 AND id = $2
            RETURNING *
            "#,
        )
        .bind(installation.system)
        .bind(installation.id)
        .bind(&installation.name)
        .bind(&installation.installation_type)
        .bind(installation.terminal)
        .bind(&installation.identifier)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| AppError::from(e).classify_constraint())?
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "{} installation {} not found",
                installation.system, installation.id
            ))
        })
    }

    /// Delete an installation. Bound equipment must be released first.
    pub async fn installations_delete(
        &self,
        conn: &mut PgConnection,
        system: System,
        id: i64,
    ) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM installations WHERE system = $1 AND id = $2")
            .bind(system)
            .bind(id)
            .execute(&mut *conn)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("{} installation {} not found", system, id)));
        }
        Ok(())
    }
}
