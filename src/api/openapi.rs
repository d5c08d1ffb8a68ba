//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{catalog, equipment, health, installations, repairs};

/// Registers the bearer token scheme referenced by the protected endpoints
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Airtrack API",
        version = "1.0.0",
        description = "Airport equipment tracking REST API: inventory, installations, binding and repair batches",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Equipment
        equipment::list_equipment,
        equipment::get_equipment,
        equipment::create_equipment,
        equipment::update_equipment,
        equipment::delete_equipment,
        equipment::check_duplicate,
        // Installations
        installations::list_installations,
        installations::get_installation,
        installations::create_installation,
        installations::update_installation,
        installations::delete_installation,
        installations::list_installation_equipment,
        installations::search_equipment,
        installations::attach_equipment,
        installations::detach_equipment,
        // Catalog
        catalog::list_equipment_types,
        catalog::list_installation_types,
        // Repairs
        repairs::list_batches,
        repairs::create_batch,
        repairs::list_candidates,
        repairs::repair_history,
        repairs::get_batch,
        repairs::update_batch_status,
        repairs::delete_batch,
    ),
    components(
        schemas(
            crate::models::System,
            crate::models::EquipmentRef,
            crate::models::CatalogEntry,
            // Equipment
            crate::models::equipment::EquipmentStatus,
            crate::models::equipment::Equipment,
            crate::models::equipment::CreateEquipment,
            crate::models::equipment::UpdateEquipment,
            crate::models::equipment::EquipmentList,
            crate::models::equipment::DuplicateCheck,
            crate::models::equipment::SerialSearchResult,
            // Installations
            crate::models::installation::Terminal,
            crate::models::installation::Installation,
            crate::models::installation::InstallationDetails,
            crate::models::installation::CreateInstallation,
            crate::models::installation::UpdateInstallation,
            installations::BindingRequest,
            // Repairs
            crate::models::repair::RepairBatchStatus,
            crate::models::repair::RepairBatch,
            crate::models::repair::RepairBatchItem,
            crate::models::repair::RepairBatchDetails,
            crate::models::repair::CreateRepairBatch,
            crate::models::repair::CreatedRepairBatch,
            crate::models::repair::UpdateRepairBatchStatus,
            crate::models::repair::RepairBatchList,
            crate::models::repair::RepairHistoryEntry,
            crate::models::repair::ModelCount,
            crate::models::repair::RepairHistory,
            crate::models::repair::RepairCandidate,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "equipment", description = "Equipment inventory per system"),
        (name = "installations", description = "Installations and equipment binding"),
        (name = "catalog", description = "Equipment and installation type catalogs"),
        (name = "repairs", description = "Repair batches and repair history")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
