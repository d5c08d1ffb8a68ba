//! Field-level change sets handed to the change-history recorder

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::{equipment::Equipment, installation::Installation, System, UserClaims};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Equipment,
    Installation,
    RepairBatch,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Equipment => "equipment",
            EntityType::Installation => "installation",
            EntityType::RepairBatch => "repair_batch",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeAction {
    Create,
    Update,
    Attach,
    Detach,
    Destroy,
    RepairEnrollment,
    /// Equipment unbound because its installation was deleted
    InstallationRemoved,
    BatchCreated,
    BatchStatusChanged,
    BatchDestroyed,
}

impl ChangeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeAction::Create => "create",
            ChangeAction::Update => "update",
            ChangeAction::Attach => "attach",
            ChangeAction::Detach => "detach",
            ChangeAction::Destroy => "destroy",
            ChangeAction::RepairEnrollment => "repair_enrollment",
            ChangeAction::InstallationRemoved => "installation_removed",
            ChangeAction::BatchCreated => "batch_created",
            ChangeAction::BatchStatusChanged => "batch_status_changed",
            ChangeAction::BatchDestroyed => "batch_destroyed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    pub old: Value,
    pub new: Value,
}

/// One recorded mutation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeSet {
    pub change_id: Uuid,
    pub entity_type: EntityType,
    pub entity_id: i64,
    pub system: Option<System>,
    pub action: ChangeAction,
    pub actor_id: Option<i64>,
    pub actor_name: Option<String>,
    /// Field name -> old/new values, in the order the fields were compared
    pub changes: IndexMap<String, FieldChange>,
    pub recorded_at: DateTime<Utc>,
}

impl ChangeSet {
    pub fn new(
        entity_type: EntityType,
        entity_id: i64,
        system: Option<System>,
        action: ChangeAction,
        actor: &UserClaims,
    ) -> Self {
        Self {
            change_id: Uuid::new_v4(),
            entity_type,
            entity_id,
            system,
            action,
            actor_id: Some(actor.user_id),
            actor_name: Some(actor.username.clone()),
            changes: IndexMap::new(),
            recorded_at: Utc::now(),
        }
    }

    pub fn with_change<T: Serialize>(mut self, field: &str, old: T, new: T) -> Self {
        self.push(field, &old, &new);
        self
    }

    fn push<T: Serialize + ?Sized>(&mut self, field: &str, old: &T, new: &T) {
        let old = serde_json::to_value(old).unwrap_or(Value::Null);
        let new = serde_json::to_value(new).unwrap_or(Value::Null);
        if old != new {
            self.changes.insert(field.to_string(), FieldChange { old, new });
        }
    }

    /// Diff of the tracked equipment fields. `before = None` records a creation.
    pub fn equipment(
        action: ChangeAction,
        before: Option<&Equipment>,
        after: &Equipment,
        actor: &UserClaims,
    ) -> Self {
        let mut set = Self::new(EntityType::Equipment, after.id, Some(after.system), action, actor);

        macro_rules! diff {
            ($field:ident) => {
                set.push(
                    stringify!($field),
                    &before.map(|b| b.$field.clone()),
                    &Some(after.$field.clone()),
                );
            };
        }

        diff!(installation_id);
        diff!(equipment_type);
        diff!(model);
        diff!(inventory_number);
        diff!(serial_number);
        diff!(status);
        diff!(note);
        diff!(repair_ticket_number);
        set
    }

    pub fn installation(
        action: ChangeAction,
        before: Option<&Installation>,
        after: &Installation,
        actor: &UserClaims,
    ) -> Self {
        let mut set = Self::new(
            EntityType::Installation,
            after.id,
            Some(after.system),
            action,
            actor,
        );

        macro_rules! diff {
            ($field:ident) => {
                set.push(
                    stringify!($field),
                    &before.map(|b| b.$field.clone()),
                    &Some(after.$field.clone()),
                );
            };
        }

        diff!(name);
        diff!(installation_type);
        diff!(terminal);
        diff!(identifier);
        set
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        equipment::{tests::equipment, EquipmentStatus},
        user::{tests::claims, Role},
    };

    #[test]
    fn test_equipment_diff_lists_only_changed_fields() {
        let before = equipment(7, None);
        let mut after = before.clone();
        after.installation_id = Some(3);
        after.status = EquipmentStatus::Active;

        let set = ChangeSet::equipment(ChangeAction::Attach, Some(&before), &after, &claims(Role::Editor));
        assert_eq!(set.changes.len(), 1);
        let change = &set.changes["installation_id"];
        assert_eq!(change.old, Value::Null);
        assert_eq!(change.new, serde_json::json!(3));
    }

    #[test]
    fn test_equipment_diff_keeps_field_order() {
        let before = equipment(7, Some(2));
        let mut after = before.clone();
        after.installation_id = None;
        after.status = EquipmentStatus::ReadyToDispatch;

        let set = ChangeSet::equipment(ChangeAction::Detach, Some(&before), &after, &claims(Role::Editor));
        let fields: Vec<&str> = set.changes.keys().map(String::as_str).collect();
        assert_eq!(fields, vec!["installation_id", "status"]);
        assert_eq!(set.changes["status"].new, serde_json::json!("ready_to_dispatch"));
    }

    #[test]
    fn test_creation_records_every_set_field() {
        let created = equipment(9, None);
        let set = ChangeSet::equipment(ChangeAction::Create, None, &created, &claims(Role::Admin));
        assert!(set.changes.contains_key("inventory_number"));
        assert!(set.changes.contains_key("status"));
        // unset optional fields compare equal to "no previous value"
        assert!(!set.changes.contains_key("note"));
        assert_eq!(set.actor_name.as_deref(), Some("admin-user"));
    }

    #[test]
    fn test_identical_records_produce_empty_set() {
        let e = equipment(1, Some(1));
        assert!(ChangeSet::equipment(ChangeAction::Update, Some(&e), &e, &claims(Role::Editor)).is_empty());
    }
}
