//! Repair batch API endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::repair::{
        CreateRepairBatch, CreatedRepairBatch, RepairBatchDetails, RepairBatchList,
        RepairBatchQuery, RepairCandidate, RepairCandidateQuery, RepairHistory,
        RepairHistoryQuery, UpdateRepairBatchStatus,
    },
};

use super::AuthenticatedUser;

/// List repair batches
#[utoipa::path(
    get,
    path = "/repairs",
    tag = "repairs",
    security(("bearer_auth" = [])),
    params(RepairBatchQuery),
    responses(
        (status = 200, description = "Repair batch list", body = RepairBatchList)
    )
)]
pub async fn list_batches(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Query(query): Query<RepairBatchQuery>,
) -> AppResult<Json<RepairBatchList>> {
    let list = state.services.repairs.list(&query).await?;
    Ok(Json(list))
}

/// Create a repair batch from selected equipment of any systems
#[utoipa::path(
    post,
    path = "/repairs",
    tag = "repairs",
    security(("bearer_auth" = [])),
    request_body = CreateRepairBatch,
    responses(
        (status = 201, description = "Repair batch created", body = CreatedRepairBatch),
        (status = 400, description = "Empty selection or ineligible equipment", body = crate::error::ErrorResponse),
        (status = 409, description = "Repair number could not be allocated", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_batch(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(data): Json<CreateRepairBatch>,
) -> AppResult<(StatusCode, Json<CreatedRepairBatch>)> {
    claims.require_write()?;
    let created = state.services.repairs.create_batch(data, &claims).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Equipment currently in maintenance, across systems
#[utoipa::path(
    get,
    path = "/repairs/candidates",
    tag = "repairs",
    security(("bearer_auth" = [])),
    params(RepairCandidateQuery),
    responses(
        (status = 200, description = "Repair candidates", body = Vec<RepairCandidate>)
    )
)]
pub async fn list_candidates(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Query(query): Query<RepairCandidateQuery>,
) -> AppResult<Json<Vec<RepairCandidate>>> {
    let candidates = state.services.repairs.candidates(&query).await?;
    Ok(Json(candidates))
}

/// Repair history with aggregates
#[utoipa::path(
    get,
    path = "/repairs/history",
    tag = "repairs",
    security(("bearer_auth" = [])),
    params(RepairHistoryQuery),
    responses(
        (status = 200, description = "Repair history, empty when nothing matches", body = RepairHistory)
    )
)]
pub async fn repair_history(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Query(query): Query<RepairHistoryQuery>,
) -> AppResult<Json<RepairHistory>> {
    let history = state.services.repairs.history(&query).await?;
    Ok(Json(history))
}

/// Get a repair batch with its item snapshots
#[utoipa::path(
    get,
    path = "/repairs/{id}",
    tag = "repairs",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Repair batch ID")),
    responses(
        (status = 200, description = "Repair batch details", body = RepairBatchDetails),
        (status = 404, description = "Repair batch not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_batch(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<i64>,
) -> AppResult<Json<RepairBatchDetails>> {
    let details = state.services.repairs.get(id).await?;
    Ok(Json(details))
}

/// Advance the status of a repair batch
#[utoipa::path(
    put,
    path = "/repairs/{id}",
    tag = "repairs",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Repair batch ID")),
    request_body = UpdateRepairBatchStatus,
    responses(
        (status = 200, description = "Status updated", body = RepairBatchDetails),
        (status = 400, description = "Status cannot go backwards", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_batch_status(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i64>,
    Json(data): Json<UpdateRepairBatchStatus>,
) -> AppResult<Json<RepairBatchDetails>> {
    claims.require_write()?;
    let details = state
        .services
        .repairs
        .update_status(id, data.status, &claims)
        .await?;
    Ok(Json(details))
}

/// Delete a repair batch
#[utoipa::path(
    delete,
    path = "/repairs/{id}",
    tag = "repairs",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Repair batch ID")),
    responses(
        (status = 204, description = "Repair batch deleted"),
        (status = 403, description = "Administrator rights required", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_batch(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    claims.require_admin()?;
    state.services.repairs.delete(id, &claims).await?;
    Ok(StatusCode::NO_CONTENT)
}
