//! Equipment lifecycle rules
//!
//! Status is a free label: manual edits may set any value. Binding and repair
//! enrollment force a status as a side effect, and enrollment is the only
//! transition with a precondition.

use chrono::{DateTime, Utc};

use crate::{
    error::{AppError, AppResult},
    models::{Equipment, EquipmentStatus, System, UserClaims},
};

/// Events that move equipment between statuses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    Attached,
    Detached,
    EnrolledInRepair,
    ManualEdit(EquipmentStatus),
}

/// Status after `event`, whatever the current status is
pub fn next_status(event: LifecycleEvent) -> EquipmentStatus {
    match event {
        LifecycleEvent::Attached => EquipmentStatus::Active,
        LifecycleEvent::Detached => EquipmentStatus::ReadyToDispatch,
        LifecycleEvent::EnrolledInRepair => EquipmentStatus::WaitingRepair,
        LifecycleEvent::ManualEdit(status) => status,
    }
}

/// Apply `event` to `equipment` in memory
pub fn apply(equipment: &mut Equipment, event: LifecycleEvent) {
    equipment.status = next_status(event);
}

/// Enrollment guard: equipment already waiting for repair is only accepted when configured
pub fn check_enrollment(equipment: &Equipment, allow_reenrollment: bool) -> AppResult<()> {
    if equipment.status == EquipmentStatus::WaitingRepair && !allow_reenrollment {
        return Err(AppError::Validation(format!(
            "{} {} ({}) is already waiting for repair (ticket {})",
            equipment.system,
            equipment.id,
            equipment.inventory_number,
            equipment.repair_ticket_number.as_deref().unwrap_or("unknown"),
        )));
    }
    Ok(())
}

/// Whether the one-item-per-type rule binds this actor in this system
pub fn duplicate_type_applies(system: System, actor: &UserClaims) -> bool {
    system.policy().duplicate_type_enforced && !actor.is_privileged()
}

/// Provenance stamp for a dirty save
pub fn stamp(equipment: &mut Equipment, actor: &UserClaims, now: DateTime<Utc>) {
    equipment.last_changed_by = Some(actor.user_id);
    equipment.last_action_date = Some(now);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        equipment::tests::equipment,
        user::{tests::claims, Role},
    };

    const ALL_STATUSES: [EquipmentStatus; 7] = [
        EquipmentStatus::Active,
        EquipmentStatus::Maintenance,
        EquipmentStatus::WaitingRepair,
        EquipmentStatus::ReadyToDispatch,
        EquipmentStatus::Decommissioned,
        EquipmentStatus::Transferred,
        EquipmentStatus::WithNote,
    ];

    #[test]
    fn test_binding_events_ignore_prior_status() {
        for prior in ALL_STATUSES {
            let mut e = equipment(1, None);
            e.status = prior;
            apply(&mut e, LifecycleEvent::Attached);
            assert_eq!(e.status, EquipmentStatus::Active);

            e.status = prior;
            apply(&mut e, LifecycleEvent::Detached);
            assert_eq!(e.status, EquipmentStatus::ReadyToDispatch);

            e.status = prior;
            apply(&mut e, LifecycleEvent::EnrolledInRepair);
            assert_eq!(e.status, EquipmentStatus::WaitingRepair);
        }
    }

    #[test]
    fn test_manual_edit_sets_any_status() {
        for target in ALL_STATUSES {
            assert_eq!(next_status(LifecycleEvent::ManualEdit(target)), target);
        }
    }

    #[test]
    fn test_decommissioned_equipment_can_be_enrolled() {
        let mut e = equipment(5, Some(1));
        e.status = EquipmentStatus::Decommissioned;
        tokio_test::assert_ok!(check_enrollment(&e, false));
    }

    #[test]
    fn test_reenrollment_is_a_policy() {
        let mut e = equipment(5, None);
        e.status = EquipmentStatus::WaitingRepair;
        e.repair_ticket_number = Some("REP-2026-004".into());

        let err = check_enrollment(&e, false).unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg.contains("REP-2026-004")));
        tokio_test::assert_ok!(check_enrollment(&e, true));
    }

    #[test]
    fn test_admins_bypass_duplicate_type() {
        assert!(duplicate_type_applies(System::Cute, &claims(Role::Editor)));
        assert!(!duplicate_type_applies(System::Cute, &claims(Role::Admin)));
    }

    #[test]
    fn test_fids_and_zamar_allow_several_items_per_type() {
        for system in [System::Fids, System::Zamar] {
            assert!(!duplicate_type_applies(system, &claims(Role::Editor)));
            assert!(!duplicate_type_applies(system, &claims(Role::Viewer)));
        }
    }

    #[test]
    fn test_stamp_sets_provenance() {
        let mut e = equipment(1, None);
        let now = Utc::now();
        stamp(&mut e, &claims(Role::Editor), now);
        assert_eq!(e.last_changed_by, Some(42));
        assert_eq!(e.last_action_date, Some(now));
    }
}
