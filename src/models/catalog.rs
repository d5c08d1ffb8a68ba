//! Equipment and installation type catalogs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use super::System;

/// One row of a type catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct CatalogEntry {
    pub id: i64,
    pub system: System,
    /// Stable code stored on equipment and installations
    pub code: String,
    /// Human-readable name, copied into repair snapshots
    pub name: String,
    pub position: i32,
    pub active: bool,
}
