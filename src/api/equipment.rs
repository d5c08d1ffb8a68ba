//! Equipment API endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::{
        equipment::{
            CreateEquipment, DuplicateCheck, DuplicateQuery, Equipment, EquipmentList,
            EquipmentQuery, UpdateEquipment,
        },
        System,
    },
};

use super::AuthenticatedUser;

/// List equipment of a system
#[utoipa::path(
    get,
    path = "/systems/{system}/equipment",
    tag = "equipment",
    security(("bearer_auth" = [])),
    params(("system" = System, Path, description = "System"), EquipmentQuery),
    responses(
        (status = 200, description = "Equipment list", body = EquipmentList)
    )
)]
pub async fn list_equipment(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(system): Path<System>,
    Query(query): Query<EquipmentQuery>,
) -> AppResult<Json<EquipmentList>> {
    let list = state.services.equipment.list(system, &query).await?;
    Ok(Json(list))
}

/// Get equipment by ID
#[utoipa::path(
    get,
    path = "/systems/{system}/equipment/{id}",
    tag = "equipment",
    security(("bearer_auth" = [])),
    params(
        ("system" = System, Path, description = "System"),
        ("id" = i64, Path, description = "Equipment ID")
    ),
    responses(
        (status = 200, description = "Equipment details", body = Equipment),
        (status = 404, description = "Equipment not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_equipment(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path((system, id)): Path<(System, i64)>,
) -> AppResult<Json<Equipment>> {
    let equipment = state.services.equipment.get(system, id).await?;
    Ok(Json(equipment))
}

/// Create equipment
#[utoipa::path(
    post,
    path = "/systems/{system}/equipment",
    tag = "equipment",
    security(("bearer_auth" = [])),
    params(("system" = System, Path, description = "System")),
    request_body = CreateEquipment,
    responses(
        (status = 201, description = "Equipment created", body = Equipment),
        (status = 400, description = "Invalid or duplicate field", body = crate::error::ErrorResponse),
        (status = 409, description = "Duplicate type at the installation", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_equipment(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(system): Path<System>,
    Json(data): Json<CreateEquipment>,
) -> AppResult<(StatusCode, Json<Equipment>)> {
    claims.require_write()?;
    let equipment = state.services.equipment.create(system, data, &claims).await?;
    Ok((StatusCode::CREATED, Json(equipment)))
}

/// Update equipment (manual edit, any status allowed)
#[utoipa::path(
    put,
    path = "/systems/{system}/equipment/{id}",
    tag = "equipment",
    security(("bearer_auth" = [])),
    params(
        ("system" = System, Path, description = "System"),
        ("id" = i64, Path, description = "Equipment ID")
    ),
    request_body = UpdateEquipment,
    responses(
        (status = 200, description = "Equipment updated", body = Equipment),
        (status = 409, description = "Duplicate type at the installation", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_equipment(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path((system, id)): Path<(System, i64)>,
    Json(data): Json<UpdateEquipment>,
) -> AppResult<Json<Equipment>> {
    claims.require_write()?;
    let equipment = state.services.equipment.update(system, id, data, &claims).await?;
    Ok(Json(equipment))
}

/// Delete equipment
#[utoipa::path(
    delete,
    path = "/systems/{system}/equipment/{id}",
    tag = "equipment",
    security(("bearer_auth" = [])),
    params(
        ("system" = System, Path, description = "System"),
        ("id" = i64, Path, description = "Equipment ID")
    ),
    responses(
        (status = 204, description = "Equipment deleted"),
        (status = 403, description = "Administrator rights required", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_equipment(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path((system, id)): Path<(System, i64)>,
) -> AppResult<StatusCode> {
    claims.require_admin()?;
    state.services.equipment.delete(system, id, &claims).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Check whether an installation already holds equipment of a type
#[utoipa::path(
    get,
    path = "/systems/{system}/equipment/duplicates",
    tag = "equipment",
    security(("bearer_auth" = [])),
    params(("system" = System, Path, description = "System"), DuplicateQuery),
    responses(
        (status = 200, description = "Duplicate check result", body = DuplicateCheck)
    )
)]
pub async fn check_duplicate(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(system): Path<System>,
    Query(query): Query<DuplicateQuery>,
) -> AppResult<Json<DuplicateCheck>> {
    let check = state.services.equipment.check_duplicate(system, &query).await?;
    Ok(Json(check))
}
