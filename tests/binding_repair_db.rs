//! Service-level tests against a real PostgreSQL database.
//!
//! Each test gets a fresh database with migrations applied.
//! Run with: DATABASE_URL=postgres://... cargo test -- --ignored

use airtrack_server::{
    config::RepairsConfig,
    models::{
        equipment::{CreateEquipment, EquipmentStatus, UpdateEquipment},
        installation::{CreateInstallation, Installation, Terminal},
        repair::{CreateRepairBatch, RepairBatchStatus, RepairHistoryQuery},
        Equipment, EquipmentRef, Role, System, UserClaims,
    },
    repository::Repository,
    services::Services,
    AppError,
};
use chrono::{Datelike, Utc};
use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions},
    PgPool,
};
use std::time::Duration;

fn actor(role: Role) -> UserClaims {
    let now = Utc::now().timestamp();
    UserClaims {
        sub: format!("{}@airport", role),
        user_id: 7,
        username: format!("{}-tester", role),
        role,
        exp: now + 3600,
        iat: now,
    }
}

fn services(pool: PgPool) -> Services {
    Services::new(Repository::new(pool), RepairsConfig::default())
}

async fn installation(services: &Services, system: System, name: &str, kind: &str) -> Installation {
    services
        .installations
        .create(
            system,
            CreateInstallation {
                name: name.to_string(),
                installation_type: kind.to_string(),
                terminal: Some(Terminal::TerminalA),
                identifier: None,
            },
            &actor(Role::Editor),
        )
        .await
        .expect("create installation")
}

async fn equipment(
    services: &Services,
    system: System,
    kind: &str,
    inventory: &str,
    serial: &str,
) -> Equipment {
    services
        .equipment
        .create(
            system,
            CreateEquipment {
                equipment_type: kind.to_string(),
                model: Some("Model X".to_string()),
                inventory_number: inventory.to_string(),
                serial_number: Some(serial.to_string()),
                status: None,
                note: None,
                installation_id: None,
            },
            &actor(Role::Editor),
        )
        .await
        .expect("create equipment")
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_attach_then_detach_moves_status(pool: PgPool) {
    let services = services(pool);
    let desk = installation(&services, System::Cute, "Desk 12", "check_in_desk").await;
    let scanner = equipment(&services, System::Cute, "scanner", "INV-1", "SN-1").await;
    assert!(scanner.installation_id.is_none());

    let attached = services
        .binding
        .attach(System::Cute, desk.id, scanner.id, &actor(Role::Editor))
        .await
        .unwrap();
    assert_eq!(attached.installation_id, Some(desk.id));
    assert_eq!(attached.status, EquipmentStatus::Active);
    assert_eq!(attached.last_changed_by, Some(7));

    let detached = services
        .binding
        .detach(System::Cute, desk.id, scanner.id, &actor(Role::Editor))
        .await
        .unwrap();
    assert!(detached.installation_id.is_none());
    assert_eq!(detached.status, EquipmentStatus::ReadyToDispatch);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_attach_rejects_bound_equipment(pool: PgPool) {
    let services = services(pool);
    let first = installation(&services, System::Fids, "Hall A", "display_zone").await;
    let second = installation(&services, System::Fids, "Hall B", "display_zone").await;
    let monitor = equipment(&services, System::Fids, "monitor", "INV-2", "SN-2").await;

    services
        .binding
        .attach(System::Fids, first.id, monitor.id, &actor(Role::Editor))
        .await
        .unwrap();

    let err = services
        .binding
        .attach(System::Fids, second.id, monitor.id, &actor(Role::Editor))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::AlreadyBound(_)));

    let unchanged = services.equipment.get(System::Fids, monitor.id).await.unwrap();
    assert_eq!(unchanged.installation_id, Some(first.id));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_duplicate_type_blocks_editor_not_admin(pool: PgPool) {
    let services = services(pool);
    let desk = installation(&services, System::Cute, "Desk 3", "check_in_desk").await;
    let first = equipment(&services, System::Cute, "scanner", "INV-3", "S-1").await;
    let second = equipment(&services, System::Cute, "scanner", "INV-4", "S-2").await;

    services
        .binding
        .attach(System::Cute, desk.id, first.id, &actor(Role::Editor))
        .await
        .unwrap();

    let err = services
        .binding
        .attach(System::Cute, desk.id, second.id, &actor(Role::Editor))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::DuplicateType(_)));

    let attached = services
        .binding
        .attach(System::Cute, desk.id, second.id, &actor(Role::Admin))
        .await
        .unwrap();
    assert_eq!(attached.installation_id, Some(desk.id));
    assert_eq!(
        services
            .installations
            .equipment(System::Cute, desk.id)
            .await
            .unwrap()
            .len(),
        2
    );
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_fids_and_zamar_take_several_items_of_a_type(pool: PgPool) {
    let services = services(pool);
    let zone = installation(&services, System::Fids, "Departures", "display_zone").await;
    let left = equipment(&services, System::Fids, "monitor", "INV-20", "M-1").await;
    let right = equipment(&services, System::Fids, "monitor", "INV-21", "M-2").await;
    for monitor in [&left, &right] {
        services
            .binding
            .attach(System::Fids, zone.id, monitor.id, &actor(Role::Editor))
            .await
            .unwrap();
    }

    let gate = installation(&services, System::Zamar, "Bag drop 3", "bag_drop").await;
    let first = equipment(&services, System::Zamar, "scanner", "INV-22", "Z-1").await;
    let second = equipment(&services, System::Zamar, "scanner", "INV-23", "Z-2").await;
    for scanner in [&first, &second] {
        services
            .binding
            .attach(System::Zamar, gate.id, scanner.id, &actor(Role::Editor))
            .await
            .unwrap();
    }

    assert_eq!(services.installations.equipment(System::Fids, zone.id).await.unwrap().len(), 2);
    assert_eq!(services.installations.equipment(System::Zamar, gate.id).await.unwrap().len(), 2);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_concurrent_attach_has_one_winner(pool: PgPool) {
    let services = services(pool);
    let first = installation(&services, System::Fids, "Hall C", "display_zone").await;
    let second = installation(&services, System::Fids, "Hall D", "display_zone").await;
    let monitor = equipment(&services, System::Fids, "monitor", "INV-24", "M-24").await;

    let editor = actor(Role::Editor);
    let (a, b) = tokio::join!(
        services.binding.attach(System::Fids, first.id, monitor.id, &editor),
        services.binding.attach(System::Fids, second.id, monitor.id, &editor),
    );

    let (winner, loser) = match (a, b) {
        (Ok(winner), Err(loser)) | (Err(loser), Ok(winner)) => (winner, loser),
        other => panic!("expected exactly one successful attach, got {:?}", other),
    };
    assert!(matches!(loser, AppError::AlreadyBound(_)));

    let stored = services.equipment.get(System::Fids, monitor.id).await.unwrap();
    assert_eq!(stored.installation_id, winner.installation_id);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_detach_from_other_installation_is_not_found(pool: PgPool) {
    let services = services(pool);
    let desk = installation(&services, System::Cute, "Desk 1", "check_in_desk").await;
    let other = installation(&services, System::Cute, "Desk 2", "check_in_desk").await;
    let printer = equipment(&services, System::Cute, "boarding_pass_printer", "INV-5", "P-1").await;

    services
        .binding
        .attach(System::Cute, desk.id, printer.id, &actor(Role::Editor))
        .await
        .unwrap();

    let err = services
        .binding
        .detach(System::Cute, other.id, printer.id, &actor(Role::Editor))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_serial_search_outcomes(pool: PgPool) {
    let services = services(pool);
    let desk = installation(&services, System::Cute, "Desk 4", "check_in_desk").await;
    let scanner = equipment(&services, System::Cute, "scanner", "INV-6", "SER-42").await;

    let found = services
        .binding
        .search_unbound_by_serial(System::Cute, " SER-42 ")
        .await
        .unwrap();
    assert_eq!(found.map(|e| e.id), Some(scanner.id));

    let missing = services
        .binding
        .search_unbound_by_serial(System::Cute, "NOPE")
        .await
        .unwrap();
    assert!(missing.is_none());

    services
        .binding
        .attach(System::Cute, desk.id, scanner.id, &actor(Role::Editor))
        .await
        .unwrap();
    let err = services
        .binding
        .search_unbound_by_serial(System::Cute, "SER-42")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::AlreadyBound(_)));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_batch_is_all_or_nothing(pool: PgPool) {
    let services = services(pool);
    let scanner = equipment(&services, System::Cute, "scanner", "INV-7", "SN-7").await;

    let err = services
        .repairs
        .create_batch(
            CreateRepairBatch {
                items: vec![
                    EquipmentRef::new(System::Cute, scanner.id),
                    EquipmentRef::new(System::Fids, 999_999),
                ],
                notes: None,
            },
            &actor(Role::Editor),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let untouched = services.equipment.get(System::Cute, scanner.id).await.unwrap();
    assert_eq!(untouched.status, EquipmentStatus::Active);
    assert!(untouched.repair_ticket_number.is_none());

    let list = services.repairs.list(&Default::default()).await.unwrap();
    assert_eq!(list.total, 0);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_batch_numbers_follow_each_other(pool: PgPool) {
    let services = services(pool);
    let year = Utc::now().year();
    let scanner = equipment(&services, System::Cute, "scanner", "INV-8", "SN-8").await;
    let monitor = equipment(&services, System::Fids, "monitor", "INV-9", "SN-9").await;
    let tablet = equipment(&services, System::Zamar, "tablet", "INV-10", "Z-10").await;

    let first = services
        .repairs
        .create_batch(
            CreateRepairBatch {
                items: vec![
                    EquipmentRef::new(System::Fids, monitor.id),
                    EquipmentRef::new(System::Cute, scanner.id),
                ],
                notes: Some("Screens flicker".to_string()),
            },
            &actor(Role::Editor),
        )
        .await
        .unwrap();
    assert_eq!(first.repair_number, format!("REP-{}-001", year));
    assert_eq!(first.equipment_count, 2);

    let second = services
        .repairs
        .create_batch(
            CreateRepairBatch {
                items: vec![EquipmentRef::new(System::Zamar, tablet.id)],
                notes: None,
            },
            &actor(Role::Editor),
        )
        .await
        .unwrap();
    assert_eq!(second.repair_number, format!("REP-{}-002", year));

    let enrolled = services.equipment.get(System::Fids, monitor.id).await.unwrap();
    assert_eq!(enrolled.status, EquipmentStatus::WaitingRepair);
    assert_eq!(enrolled.repair_ticket_number.as_deref(), Some(first.repair_number.as_str()));

    // Already waiting for repair
    let err = services
        .repairs
        .create_batch(
            CreateRepairBatch {
                items: vec![EquipmentRef::new(System::Fids, monitor.id)],
                notes: None,
            },
            &actor(Role::Editor),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_batch_items_keep_their_snapshot(pool: PgPool) {
    let services = services(pool.clone());
    let desk = installation(&services, System::Cute, "Gate 7", "boarding_gate").await;
    let reader = equipment(&services, System::Cute, "gate_reader", "INV-11", "GR-1").await;
    services
        .binding
        .attach(System::Cute, desk.id, reader.id, &actor(Role::Editor))
        .await
        .unwrap();

    let created = services
        .repairs
        .create_batch(
            CreateRepairBatch {
                items: vec![EquipmentRef::new(System::Cute, reader.id)],
                notes: None,
            },
            &actor(Role::Editor),
        )
        .await
        .unwrap();

    services
        .equipment
        .update(
            System::Cute,
            reader.id,
            UpdateEquipment {
                model: Some("Replacement model".to_string()),
                ..Default::default()
            },
            &actor(Role::Editor),
        )
        .await
        .unwrap();

    let details = services.repairs.get(created.id).await.unwrap();
    let item = &details.items[0];
    assert_eq!(item.model.as_deref(), Some("Model X"));
    assert_eq!(item.installation_name.as_deref(), Some("Gate 7"));
    assert_eq!(item.terminal.as_deref(), Some("A"));
    assert_eq!(item.equipment_type_name.as_deref(), Some("Gate reader"));

    let rewrite = sqlx::query("UPDATE repair_batch_items SET model = 'tampered' WHERE id = $1")
        .bind(item.id)
        .execute(&pool)
        .await;
    assert!(rewrite.is_err());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_batch_status_only_moves_forward(pool: PgPool) {
    let services = services(pool);
    let scanner = equipment(&services, System::Cute, "scanner", "INV-12", "SN-12").await;
    let created = services
        .repairs
        .create_batch(
            CreateRepairBatch {
                items: vec![EquipmentRef::new(System::Cute, scanner.id)],
                notes: None,
            },
            &actor(Role::Editor),
        )
        .await
        .unwrap();

    let received = services
        .repairs
        .update_status(created.id, RepairBatchStatus::Received, &actor(Role::Editor))
        .await
        .unwrap();
    assert_eq!(received.batch.status, RepairBatchStatus::Received);

    let err = services
        .repairs
        .update_status(created.id, RepairBatchStatus::Sent, &actor(Role::Editor))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_deleting_installation_unbinds_equipment(pool: PgPool) {
    let services = services(pool);
    let zone = installation(&services, System::Fids, "Arrivals", "display_zone").await;
    let monitor = equipment(&services, System::Fids, "monitor", "INV-13", "SN-13").await;
    services
        .binding
        .attach(System::Fids, zone.id, monitor.id, &actor(Role::Editor))
        .await
        .unwrap();

    services
        .installations
        .delete(System::Fids, zone.id, &actor(Role::Admin))
        .await
        .unwrap();

    let orphan = services.equipment.get(System::Fids, monitor.id).await.unwrap();
    assert!(orphan.installation_id.is_none());
    assert_eq!(orphan.status, EquipmentStatus::Active);

    let err = services.installations.get(System::Fids, zone.id).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_batches_on_a_small_pool_do_not_starve(
    _pool_options: PgPoolOptions,
    connect_options: PgConnectOptions,
) {
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .acquire_timeout(Duration::from_secs(3))
        .connect_with(connect_options)
        .await
        .unwrap();
    let services = services(pool);
    let year = Utc::now().year();
    let scanner = equipment(&services, System::Cute, "scanner", "INV-30", "SN-30").await;
    let monitor = equipment(&services, System::Fids, "monitor", "INV-31", "SN-31").await;

    let editor = actor(Role::Editor);
    let batch = |reference: EquipmentRef| {
        services.repairs.create_batch(
            CreateRepairBatch {
                items: vec![reference],
                notes: None,
            },
            &editor,
        )
    };
    let (a, b) = tokio::join!(
        batch(EquipmentRef::new(System::Cute, scanner.id)),
        batch(EquipmentRef::new(System::Fids, monitor.id)),
    );

    let mut numbers = vec![a.unwrap().repair_number, b.unwrap().repair_number];
    numbers.sort();
    assert_eq!(
        numbers,
        vec![format!("REP-{}-001", year), format!("REP-{}-002", year)]
    );
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_concurrent_batches_retry_on_number_collision(pool: PgPool) {
    let services = Services::new(
        Repository::new(pool),
        RepairsConfig {
            number_retry_limit: 5,
            ..RepairsConfig::default()
        },
    );
    let year = Utc::now().year();

    let mut references = Vec::new();
    for n in 0..4 {
        let item = equipment(
            &services,
            System::Cute,
            "keyboard",
            &format!("INV-4{}", n),
            &format!("K-{}", n),
        )
        .await;
        references.push(EquipmentRef::new(System::Cute, item.id));
    }

    let editor = actor(Role::Editor);
    let handles: Vec<_> = references
        .into_iter()
        .map(|reference| {
            let services = services.clone();
            let editor = editor.clone();
            tokio::spawn(async move {
                services
                    .repairs
                    .create_batch(
                        CreateRepairBatch {
                            items: vec![reference],
                            notes: None,
                        },
                        &editor,
                    )
                    .await
            })
        })
        .collect();

    let mut numbers = Vec::new();
    for handle in handles {
        numbers.push(handle.await.unwrap().unwrap().repair_number);
    }
    numbers.sort();
    let expected: Vec<String> = (1..=4).map(|n| format!("REP-{}-{:03}", year, n)).collect();
    assert_eq!(numbers, expected);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_history_outlives_deleted_equipment(pool: PgPool) {
    let services = services(pool);
    let year = Utc::now().year();
    let tablet = equipment(&services, System::Zamar, "tablet", "INV-50", "Z-50").await;
    let editor = actor(Role::Editor);
    let enroll = || {
        services.repairs.create_batch(
            CreateRepairBatch {
                items: vec![EquipmentRef::new(System::Zamar, tablet.id)],
                notes: None,
            },
            &editor,
        )
    };

    let first = enroll().await.unwrap();
    services
        .equipment
        .update(
            System::Zamar,
            tablet.id,
            UpdateEquipment {
                status: Some(EquipmentStatus::Active),
                ..Default::default()
            },
            &editor,
        )
        .await
        .unwrap();
    let second = enroll().await.unwrap();

    services
        .equipment
        .delete(System::Zamar, tablet.id, &actor(Role::Admin))
        .await
        .unwrap();

    let history = services
        .repairs
        .history(&RepairHistoryQuery {
            serial_number: Some(" Z-50 ".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(history.total_repairs, 2);
    assert_eq!(history.unique_serials, 1);
    let numbers: Vec<&str> = history.entries.iter().map(|e| e.repair_number.as_str()).collect();
    assert_eq!(
        numbers,
        vec![format!("REP-{}-002", year), format!("REP-{}-001", year)]
    );

    let details = services.repairs.get(first.id).await.unwrap();
    assert_eq!(details.items.len(), 1);
    assert_eq!(details.items[0].equipment_id, tablet.id);
    assert_eq!(details.items[0].serial_number.as_deref(), Some("Z-50"));
    assert_eq!(details.items[0].equipment_type_name.as_deref(), Some("Tablet"));
    assert_eq!(services.repairs.get(second.id).await.unwrap().items.len(), 1);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_blank_inventory_number_is_rejected(pool: PgPool) {
    let services = services(pool);
    let err = services
        .equipment
        .create(
            System::Cute,
            CreateEquipment {
                equipment_type: "scanner".to_string(),
                model: None,
                inventory_number: "   ".to_string(),
                serial_number: None,
                status: None,
                note: None,
                installation_id: None,
            },
            &actor(Role::Editor),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let scanner = equipment(&services, System::Cute, "scanner", "INV-60", "SN-60").await;
    let err = services
        .equipment
        .update(
            System::Cute,
            scanner.id,
            UpdateEquipment {
                inventory_number: Some("  ".to_string()),
                ..Default::default()
            },
            &actor(Role::Editor),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let stored = services.equipment.get(System::Cute, scanner.id).await.unwrap();
    assert_eq!(stored.inventory_number, "INV-60");
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_type_change_waits_for_the_current_installation(pool: PgPool) {
    let services = services(pool.clone());
    let desk = installation(&services, System::Cute, "Desk 9", "check_in_desk").await;
    let printer = equipment(&services, System::Cute, "boarding_pass_printer", "INV-70", "P-70").await;
    services
        .binding
        .attach(System::Cute, desk.id, printer.id, &actor(Role::Editor))
        .await
        .unwrap();

    // Another writer holds the installation, as an attach in progress would
    let mut holder = pool.begin().await.unwrap();
    sqlx::query("SELECT id FROM installations WHERE id = $1 FOR UPDATE")
        .bind(desk.id)
        .execute(&mut *holder)
        .await
        .unwrap();

    let editor = actor(Role::Editor);
    let update = services.equipment.update(
        System::Cute,
        printer.id,
        UpdateEquipment {
            equipment_type: Some("scanner".to_string()),
            ..Default::default()
        },
        &editor,
    );
    tokio::pin!(update);

    let blocked = tokio::time::timeout(Duration::from_millis(300), &mut update).await;
    assert!(blocked.is_err(), "type change must wait for the installation lock");

    holder.rollback().await.unwrap();
    let updated = update.await.unwrap();
    assert_eq!(updated.equipment_type, "scanner");
    assert_eq!(updated.installation_id, Some(desk.id));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_numbering_continues_past_999(pool: PgPool) {
    let year = Utc::now().year();
    for number in [format!("REP-{}-999", year), format!("REP-{}-998", year)] {
        sqlx::query("INSERT INTO repair_batches (repair_number) VALUES ($1)")
            .bind(number)
            .execute(&pool)
            .await
            .unwrap();
    }

    let services = services(pool);
    let scanner = equipment(&services, System::Cute, "scanner", "INV-80", "SN-80").await;
    let created = services
        .repairs
        .create_batch(
            CreateRepairBatch {
                items: vec![EquipmentRef::new(System::Cute, scanner.id)],
                notes: None,
            },
            &actor(Role::Editor),
        )
        .await
        .unwrap();
    assert_eq!(created.repair_number, format!("REP-{}-1000", year));
}
