//! Installation API endpoints, including equipment binding

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::{
        equipment::{SerialSearchQuery, SerialSearchResult},
        installation::{
            CreateInstallation, Installation, InstallationDetails, InstallationQuery,
            UpdateInstallation,
        },
        Equipment, System,
    },
};

use super::AuthenticatedUser;

/// Attach/detach request
#[derive(Debug, Deserialize, ToSchema)]
pub struct BindingRequest {
    pub equipment_id: i64,
}

/// List installations of a system
#[utoipa::path(
    get,
    path = "/systems/{system}/installations",
    tag = "installations",
    security(("bearer_auth" = [])),
    params(("system" = System, Path, description = "System"), InstallationQuery),
    responses(
        (status = 200, description = "Installation list", body = Vec<Installation>)
    )
)]
pub async fn list_installations(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(system): Path<System>,
    Query(query): Query<InstallationQuery>,
) -> AppResult<Json<Vec<Installation>>> {
    let installations = state.services.installations.list(system, &query).await?;
    Ok(Json(installations))
}

/// Get installation by ID, with its equipment count
#[utoipa::path(
    get,
    path = "/systems/{system}/installations/{id}",
    tag = "installations",
    security(("bearer_auth" = [])),
    params(
        ("system" = System, Path, description = "System"),
        ("id" = i64, Path, description = "Installation ID")
    ),
    responses(
        (status = 200, description = "Installation details", body = InstallationDetails),
        (status = 404, description = "Installation not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_installation(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path((system, id)): Path<(System, i64)>,
) -> AppResult<Json<InstallationDetails>> {
    let details = state.services.installations.get(system, id).await?;
    Ok(Json(details))
}

/// Create installation
#[utoipa::path(
    post,
    path = "/systems/{system}/installations",
    tag = "installations",
    security(("bearer_auth" = [])),
    params(("system" = System, Path, description = "System")),
    request_body = CreateInstallation,
    responses(
        (status = 201, description = "Installation created", body = Installation)
    )
)]
pub async fn create_installation(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(system): Path<System>,
    Json(data): Json<CreateInstallation>,
) -> AppResult<(StatusCode, Json<Installation>)> {
    claims.require_write()?;
    let installation = state.services.installations.create(system, data, &claims).await?;
    Ok((StatusCode::CREATED, Json(installation)))
}

/// Update installation
#[utoipa::path(
    put,
    path = "/systems/{system}/installations/{id}",
    tag = "installations",
    security(("bearer_auth" = [])),
    params(
        ("system" = System, Path, description = "System"),
        ("id" = i64, Path, description = "Installation ID")
    ),
    request_body = UpdateInstallation,
    responses(
        (status = 200, description = "Installation updated", body = Installation)
    )
)]
pub async fn update_installation(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path((system, id)): Path<(System, i64)>,
    Json(data): Json<UpdateInstallation>,
) -> AppResult<Json<Installation>> {
    claims.require_write()?;
    let installation = state
        .services
        .installations
        .update(system, id, data, &claims)
        .await?;
    Ok(Json(installation))
}

/// Delete installation; bound equipment is moved to the warehouse
#[utoipa::path(
    delete,
    path = "/systems/{system}/installations/{id}",
    tag = "installations",
    security(("bearer_auth" = [])),
    params(
        ("system" = System, Path, description = "System"),
        ("id" = i64, Path, description = "Installation ID")
    ),
    responses(
        (status = 204, description = "Installation deleted"),
        (status = 403, description = "Administrator rights required", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_installation(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path((system, id)): Path<(System, i64)>,
) -> AppResult<StatusCode> {
    claims.require_admin()?;
    state.services.installations.delete(system, id, &claims).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Equipment bound to an installation
#[utoipa::path(
    get,
    path = "/systems/{system}/installations/{id}/equipment",
    tag = "installations",
    security(("bearer_auth" = [])),
    params(
        ("system" = System, Path, description = "System"),
        ("id" = i64, Path, description = "Installation ID")
    ),
    responses(
        (status = 200, description = "Bound equipment", body = Vec<Equipment>)
    )
)]
pub async fn list_installation_equipment(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path((system, id)): Path<(System, i64)>,
) -> AppResult<Json<Vec<Equipment>>> {
    let equipment = state.services.installations.equipment(system, id).await?;
    Ok(Json(equipment))
}

/// Find unbound equipment by serial number for this installation
#[utoipa::path(
    get,
    path = "/systems/{system}/installations/{id}/search-equipment",
    tag = "installations",
    security(("bearer_auth" = [])),
    params(
        ("system" = System, Path, description = "System"),
        ("id" = i64, Path, description = "Installation ID"),
        SerialSearchQuery
    ),
    responses(
        (status = 200, description = "Search result, `equipment` is null when nothing matches", body = SerialSearchResult),
        (status = 400, description = "Blank serial number", body = crate::error::ErrorResponse),
        (status = 409, description = "Equipment is bound elsewhere", body = crate::error::ErrorResponse)
    )
)]
pub async fn search_equipment(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path((system, id)): Path<(System, i64)>,
    Query(query): Query<SerialSearchQuery>,
) -> AppResult<Json<SerialSearchResult>> {
    let result = state
        .services
        .binding
        .search_for_installation(system, id, &query.serial_number, &claims)
        .await?;
    Ok(Json(result))
}

/// Attach unbound equipment to the installation
#[utoipa::path(
    post,
    path = "/systems/{system}/installations/{id}/attach",
    tag = "installations",
    security(("bearer_auth" = [])),
    params(
        ("system" = System, Path, description = "System"),
        ("id" = i64, Path, description = "Installation ID")
    ),
    request_body = BindingRequest,
    responses(
        (status = 200, description = "Equipment attached, status is active", body = Equipment),
        (status = 404, description = "Installation or equipment not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Already bound or duplicate type", body = crate::error::ErrorResponse)
    )
)]
pub async fn attach_equipment(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path((system, id)): Path<(System, i64)>,
    Json(request): Json<BindingRequest>,
) -> AppResult<Json<Equipment>> {
    claims.require_write()?;
    let equipment = state
        .services
        .binding
        .attach(system, id, request.equipment_id, &claims)
        .await?;
    Ok(Json(equipment))
}

/// Detach equipment from the installation
#[utoipa::path(
    post,
    path = "/systems/{system}/installations/{id}/detach",
    tag = "installations",
    security(("bearer_auth" = [])),
    params(
        ("system" = System, Path, description = "System"),
        ("id" = i64, Path, description = "Installation ID")
    ),
    request_body = BindingRequest,
    responses(
        (status = 200, description = "Equipment detached, status is ready_to_dispatch", body = Equipment),
        (status = 404, description = "Equipment is not bound to this installation", body = crate::error::ErrorResponse)
    )
)]
pub async fn detach_equipment(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path((system, id)): Path<(System, i64)>,
    Json(request): Json<BindingRequest>,
) -> AppResult<Json<Equipment>> {
    claims.require_write()?;
    let equipment = state
        .services
        .binding
        .detach(system, id, request.equipment_id, &claims)
        .await?;
    Ok(Json(equipment))
}
