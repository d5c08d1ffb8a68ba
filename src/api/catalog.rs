//! Type catalog endpoints (read-only)

use axum::{
    extract::{Path, State},
    Json,
};

use crate::{error::AppResult, models::{CatalogEntry, System}};

use super::AuthenticatedUser;

/// Active equipment types of a system
#[utoipa::path(
    get,
    path = "/systems/{system}/equipment-types",
    tag = "catalog",
    security(("bearer_auth" = [])),
    params(("system" = System, Path, description = "System")),
    responses(
        (status = 200, description = "Equipment types", body = Vec<CatalogEntry>)
    )
)]
pub async fn list_equipment_types(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(system): Path<System>,
) -> AppResult<Json<Vec<CatalogEntry>>> {
    let types = state.services.catalog.equipment_types(system).await?;
    Ok(Json(types))
}

/// Active installation types of a system
#[utoipa::path(
    get,
    path = "/systems/{system}/installation-types",
    tag = "catalog",
    security(("bearer_auth" = [])),
    params(("system" = System, Path, description = "System")),
    responses(
        (status = 200, description = "Installation types", body = Vec<CatalogEntry>)
    )
)]
pub async fn list_installation_types(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(system): Path<System>,
) -> AppResult<Json<Vec<CatalogEntry>>> {
    let types = state.services.catalog.installation_types(system).await?;
    Ok(Json(types))
}
