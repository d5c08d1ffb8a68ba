//! Equipment model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::{installation::Terminal, normalize_text, System};

/// Equipment lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EquipmentStatus {
    #[default]
    Active,
    Maintenance,
    WaitingRepair,
    ReadyToDispatch,
    Decommissioned,
    Transferred,
    WithNote,
}

impl EquipmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EquipmentStatus::Active => "active",
            EquipmentStatus::Maintenance => "maintenance",
            EquipmentStatus::WaitingRepair => "waiting_repair",
            EquipmentStatus::ReadyToDispatch => "ready_to_dispatch",
            EquipmentStatus::Decommissioned => "decommissioned",
            EquipmentStatus::Transferred => "transferred",
            EquipmentStatus::WithNote => "with_note",
        }
    }
}

impl std::fmt::Display for EquipmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            EquipmentStatus::Active => "Active",
            EquipmentStatus::Maintenance => "Maintenance",
            EquipmentStatus::WaitingRepair => "Waiting for repair",
            EquipmentStatus::ReadyToDispatch => "Ready to dispatch",
            EquipmentStatus::Decommissioned => "Decommissioned",
            EquipmentStatus::Transferred => "Transferred",
            EquipmentStatus::WithNote => "With note",
        };
        write!(f, "{}", label)
    }
}

impl std::str::FromStr for EquipmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(EquipmentStatus::Active),
            "maintenance" => Ok(EquipmentStatus::Maintenance),
            "waiting_repair" => Ok(EquipmentStatus::WaitingRepair),
            "ready_to_dispatch" => Ok(EquipmentStatus::ReadyToDispatch),
            "decommissioned" => Ok(EquipmentStatus::Decommissioned),
            "transferred" => Ok(EquipmentStatus::Transferred),
            "with_note" => Ok(EquipmentStatus::WithNote),
            _ => Err(format!("Invalid equipment status: {}", s)),
        }
    }
}

pg_text_enum!(EquipmentStatus);

/// Equipment record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Equipment {
    pub id: i64,
    pub system: System,
    /// Bound installation, `None` while the item sits in the warehouse
    pub installation_id: Option<i64>,
    /// Equipment type code from the equipment type catalog
    pub equipment_type: String,
    pub model: Option<String>,
    /// Unique within the system
    pub inventory_number: String,
    pub serial_number: Option<String>,
    pub status: EquipmentStatus,
    pub note: Option<String>,
    /// Repair act number the item was last sent out with
    pub repair_ticket_number: Option<String>,
    pub owner_id: Option<i64>,
    pub last_changed_by: Option<i64>,
    pub last_action_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Equipment {
    pub fn is_bound(&self) -> bool {
        self.installation_id.is_some()
    }

    /// Copy of this equipment with a manual edit applied (no lifecycle side effects)
    pub fn apply_update(&self, data: &UpdateEquipment) -> Equipment {
        let mut next = self.clone();
        if let Some(equipment_type) = &data.equipment_type {
            next.equipment_type = equipment_type.trim().to_string();
        }
        if data.model.is_some() {
            next.model = normalize_text(data.model.clone());
        }
        if let Some(inventory_number) = &data.inventory_number {
            next.inventory_number = inventory_number.trim().to_string();
        }
        if data.serial_number.is_some() {
            next.serial_number = normalize_text(data.serial_number.clone());
        }
        if let Some(status) = data.status {
            next.status = status;
        }
        if data.note.is_some() {
            next.note = normalize_text(data.note.clone());
        }
        if data.repair_ticket_number.is_some() {
            next.repair_ticket_number = normalize_text(data.repair_ticket_number.clone());
        }
        if let Some(installation_id) = data.installation_id {
            next.installation_id = installation_id;
        }
        next
    }
}

/// Create equipment request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateEquipment {
    #[validate(length(min = 1, max = 100, message = "Equipment type is required"))]
    pub equipment_type: String,
    #[validate(length(max = 255, message = "Model must be at most 255 characters"))]
    pub model: Option<String>,
    #[validate(length(min = 1, max = 100, message = "Inventory number must be 1-100 characters"))]
    pub inventory_number: String,
    #[validate(length(max = 100, message = "Serial number must be at most 100 characters"))]
    pub serial_number: Option<String>,
    pub status: Option<EquipmentStatus>,
    #[validate(length(max = 2000, message = "Note must be at most 2000 characters"))]
    pub note: Option<String>,
    pub installation_id: Option<i64>,
}

impl CreateEquipment {
    pub fn normalized(self) -> Self {
        Self {
            equipment_type: self.equipment_type.trim().to_string(),
            model: normalize_text(self.model),
            inventory_number: self.inventory_number.trim().to_string(),
            serial_number: normalize_text(self.serial_number),
            status: self.status,
            note: normalize_text(self.note),
            installation_id: self.installation_id,
        }
    }
}

/// Update equipment request (manual edit)
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateEquipment {
    #[validate(length(min = 1, max = 100, message = "Equipment type is required"))]
    pub equipment_type: Option<String>,
    /// Blank clears the model
    #[validate(length(max = 255, message = "Model must be at most 255 characters"))]
    pub model: Option<String>,
    #[validate(length(min = 1, max = 100, message = "Inventory number must be 1-100 characters"))]
    pub inventory_number: Option<String>,
    /// Blank clears the serial number
    #[validate(length(max = 100, message = "Serial number must be at most 100 characters"))]
    pub serial_number: Option<String>,
    /// Any status may be set directly
    pub status: Option<EquipmentStatus>,
    #[validate(length(max = 2000, message = "Note must be at most 2000 characters"))]
    pub note: Option<String>,
    #[validate(length(max = 32, message = "Repair ticket number must be at most 32 characters"))]
    pub repair_ticket_number: Option<String>,
    /// `null` moves the item to the warehouse, absent leaves the binding unchanged
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<i64>)]
    pub installation_id: Option<Option<i64>>,
}

impl UpdateEquipment {
    /// Trim the required fields so blank values fail validation instead of being stored
    pub fn normalized(mut self) -> Self {
        self.equipment_type = self.equipment_type.map(|v| v.trim().to_string());
        self.inventory_number = self.inventory_number.map(|v| v.trim().to_string());
        self
    }
}

/// Equipment list filters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct EquipmentQuery {
    pub status: Option<EquipmentStatus>,
    pub equipment_type: Option<String>,
    pub installation_id: Option<i64>,
    pub terminal: Option<Terminal>,
    /// Only equipment that is not bound to any installation
    pub unassigned: Option<bool>,
    /// Matches model, inventory number or serial number
    pub search: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Paginated equipment list
#[derive(Debug, Serialize, ToSchema)]
pub struct EquipmentList {
    pub items: Vec<Equipment>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
}

/// Duplicate-type check parameters
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct DuplicateQuery {
    pub equipment_type: String,
    pub installation_id: i64,
    /// Equipment to ignore, typically the one being edited
    pub exclude_id: Option<i64>,
}

/// Duplicate-type check result
#[derive(Debug, Serialize, ToSchema)]
pub struct DuplicateCheck {
    pub duplicate: bool,
    pub equipment: Option<Equipment>,
}

/// Serial search request, scoped to an installation
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct SerialSearchQuery {
    pub serial_number: String,
}

/// Unbound equipment found for an installation
#[derive(Debug, Serialize, ToSchema)]
pub struct SerialSearchResult {
    /// `None` when no equipment carries this serial number
    pub equipment: Option<Equipment>,
    /// Equipment of the same type already at the installation, attaching would be refused
    pub duplicate: Option<Equipment>,
}

/// Outcome of looking up warehouse equipment by serial number
#[derive(Debug, Clone, PartialEq)]
pub enum SerialLookup {
    /// An unbound item carries this serial number
    Available(Equipment),
    /// Only bound items carry this serial number
    AlreadyBound(Equipment),
    NotFound,
}

impl SerialLookup {
    /// Unbound matches win over bound ones; lowest id first among equals
    pub fn classify(mut matches: Vec<Equipment>) -> Self {
        matches.sort_by_key(|e| (e.is_bound(), e.id));
        match matches.into_iter().next() {
            Some(equipment) if !equipment.is_bound() => SerialLookup::Available(equipment),
            Some(equipment) => SerialLookup::AlreadyBound(equipment),
            None => SerialLookup::NotFound,
        }
    }
}
