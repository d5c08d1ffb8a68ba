//! Repair batch ("repair act") models

use chrono::{DateTime, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::{
    equipment::Equipment, installation::Installation, installation::Terminal, EquipmentRef,
    System,
};

/// Repair batch status, in workflow order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RepairBatchStatus {
    #[default]
    Sent,
    InProgress,
    Received,
    Closed,
}

impl RepairBatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RepairBatchStatus::Sent => "sent",
            RepairBatchStatus::InProgress => "in_progress",
            RepairBatchStatus::Received => "received",
            RepairBatchStatus::Closed => "closed",
        }
    }

    fn rank(&self) -> u8 {
        match self {
            RepairBatchStatus::Sent => 0,
            RepairBatchStatus::InProgress => 1,
            RepairBatchStatus::Received => 2,
            RepairBatchStatus::Closed => 3,
        }
    }

    /// Batches only move forward; skipping steps is allowed
    pub fn can_advance_to(&self, next: RepairBatchStatus) -> bool {
        next.rank() > self.rank()
    }
}

impl std::str::FromStr for RepairBatchStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sent" => Ok(RepairBatchStatus::Sent),
            "in_progress" => Ok(RepairBatchStatus::InProgress),
            "received" => Ok(RepairBatchStatus::Received),
            "closed" => Ok(RepairBatchStatus::Closed),
            _ => Err(format!("Invalid repair batch status: {}", s)),
        }
    }
}

pg_text_enum!(RepairBatchStatus);

static REPAIR_NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^REP-(\d{4})-(\d{3,})$").expect("valid repair number regex"));

/// Human-readable batch number `REP-<year>-<sequence>`, sequence restarting every year
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RepairNumber {
    pub year: i32,
    pub sequence: u32,
}

impl RepairNumber {
    pub fn first(year: i32) -> Self {
        Self { year, sequence: 1 }
    }

    /// Number following the highest sequence already issued this year
    pub fn next_after(year: i32, highest: Option<u32>) -> Self {
        match highest {
            Some(sequence) => Self { year, sequence: sequence + 1 },
            None => Self::first(year),
        }
    }

    /// `LIKE` pattern matching every number issued in `year`
    pub fn year_pattern(year: i32) -> String {
        format!("REP-{}-%", year)
    }
}

impl std::fmt::Display for RepairNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "REP-{}-{:03}", self.year, self.sequence)
    }
}

impl std::str::FromStr for RepairNumber {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = REPAIR_NUMBER_RE
            .captures(s)
            .ok_or_else(|| format!("Invalid repair number: {}", s))?;
        let year = caps[1].parse().map_err(|_| format!("Invalid repair year: {}", s))?;
        let sequence = caps[2]
            .parse()
            .map_err(|_| format!("Invalid repair sequence: {}", s))?;
        Ok(Self { year, sequence })
    }
}

/// Repair batch record
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct RepairBatch {
    pub id: i64,
    pub repair_number: String,
    pub created_by: Option<i64>,
    pub created_by_name: Option<String>,
    pub status: RepairBatchStatus,
    pub equipment_count: i32,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Point-in-time copy of an equipment item sent to repair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct RepairBatchItem {
    pub id: i64,
    pub repair_batch_id: i64,
    pub system: System,
    /// Source equipment id, for lookup only
    pub equipment_id: i64,
    pub equipment_type: String,
    pub equipment_type_name: Option<String>,
    pub serial_number: Option<String>,
    pub model: Option<String>,
    pub inventory_number: Option<String>,
    /// Terminal letter at enrollment time
    pub terminal: Option<String>,
    pub installation_name: Option<String>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Snapshot fields about to be inserted as a batch item
#[derive(Debug, Clone, PartialEq)]
pub struct NewRepairBatchItem {
    pub system: System,
    pub equipment_id: i64,
    pub equipment_type: String,
    pub equipment_type_name: Option<String>,
    pub serial_number: Option<String>,
    pub model: Option<String>,
    pub inventory_number: Option<String>,
    pub terminal: Option<String>,
    pub installation_name: Option<String>,
    pub note: Option<String>,
}

impl NewRepairBatchItem {
    pub fn snapshot(
        equipment: &Equipment,
        installation: Option<&Installation>,
        equipment_type_name: Option<String>,
    ) -> Self {
        Self {
            system: equipment.system,
            equipment_id: equipment.id,
            equipment_type: equipment.equipment_type.clone(),
            equipment_type_name,
            serial_number: equipment.serial_number.clone(),
            model: equipment.model.clone(),
            inventory_number: Some(equipment.inventory_number.clone()),
            terminal: installation
                .and_then(|i| i.terminal_name())
                .map(str::to_string),
            installation_name: installation.map(|i| i.name.clone()),
            note: equipment.note.clone(),
        }
    }
}

/// Batch with its items
#[derive(Debug, Serialize, ToSchema)]
pub struct RepairBatchDetails {
    pub batch: RepairBatch,
    pub items: Vec<RepairBatchItem>,
}

/// Create repair batch request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateRepairBatch {
    /// Equipment to send, may mix systems
    pub items: Vec<EquipmentRef>,
    #[validate(length(max = 2000, message = "Notes must be at most 2000 characters"))]
    pub notes: Option<String>,
}

/// Identity of a freshly created batch
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CreatedRepairBatch {
    pub id: i64,
    pub repair_number: String,
    pub equipment_count: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateRepairBatchStatus {
    pub status: RepairBatchStatus,
}

/// Batch list filters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct RepairBatchQuery {
    pub status: Option<RepairBatchStatus>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Paginated batch list
#[derive(Debug, Serialize, ToSchema)]
pub struct RepairBatchList {
    pub batches: Vec<RepairBatch>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
}

/// Repair history filters; all optional
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct RepairHistoryQuery {
    pub serial_number: Option<String>,
    pub system: Option<System>,
    /// Inclusive, `YYYY-MM-DD`
    pub date_from: Option<NaiveDate>,
    /// Inclusive, `YYYY-MM-DD`
    pub date_to: Option<NaiveDate>,
}

/// Batch item with the batch it belongs to
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct RepairHistoryEntry {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub item: RepairBatchItem,
    pub repair_number: String,
    pub batch_status: RepairBatchStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow, ToSchema)]
pub struct ModelCount {
    pub model: String,
    pub count: i64,
}

/// Repair history result with aggregate stats
#[derive(Debug, Serialize, ToSchema)]
pub struct RepairHistory {
    pub serial_number: Option<String>,
    pub total_repairs: i64,
    pub unique_serials: i64,
    pub top_models: Vec<ModelCount>,
    pub entries: Vec<RepairHistoryEntry>,
}

impl RepairHistory {
    /// Derive the stats from the matching entries
    pub fn from_entries(serial_number: Option<String>, entries: Vec<RepairHistoryEntry>) -> Self {
        let unique_serials = entries
            .iter()
            .filter_map(|e| e.item.serial_number.as_deref())
            .collect::<std::collections::HashSet<_>>()
            .len() as i64;

        let mut counts: indexmap::IndexMap<&str, i64> = indexmap::IndexMap::new();
        for model in entries.iter().filter_map(|e| e.item.model.as_deref()) {
            *counts.entry(model).or_insert(0) += 1;
        }
        let mut top_models: Vec<ModelCount> = counts
            .into_iter()
            .map(|(model, count)| ModelCount { model: model.to_string(), count })
            .collect();
        top_models.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.model.cmp(&b.model)));
        top_models.truncate(5);

        Self {
            serial_number,
            total_repairs: entries.len() as i64,
            unique_serials,
            top_models,
            entries,
        }
    }
}

/// Equipment waiting in maintenance, ready to be picked for a batch
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct RepairCandidate {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub equipment: Equipment,
    pub installation_name: Option<String>,
    pub terminal: Option<Terminal>,
}

#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct RepairCandidateQuery {
    pub system: Option<System>,
    pub terminal: Option<Terminal>,
    pub equipment_type: Option<String>,
}
