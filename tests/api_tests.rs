//! API integration tests against a running server

use airtrack_server::models::{Role, UserClaims};
use reqwest::Client;
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:8080/api/v1";
const JWT_SECRET: &str = "change-this-secret-in-production";

/// Token signed with the development secret from config/default.toml
fn token(role: Role) -> String {
    let now = chrono::Utc::now().timestamp();
    UserClaims {
        sub: format!("{}@airport", role),
        user_id: 1,
        username: format!("api-{}", role),
        role,
        exp: now + 600,
        iat: now,
    }
    .create_token(JWT_SECRET)
    .expect("Failed to sign token")
}

/// Unique suffix so repeated runs do not collide on inventory numbers
fn suffix() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..8].to_string()
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_missing_token_is_rejected() {
    let client = Client::new();

    let response = client
        .get(format!("{}/systems/cute/equipment", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);
}

#[tokio::test]
#[ignore]
async fn test_viewer_cannot_create_equipment() {
    let client = Client::new();

    let response = client
        .post(format!("{}/systems/cute/equipment", BASE_URL))
        .bearer_auth(token(Role::Viewer))
        .json(&json!({
            "equipment_type": "scanner",
            "inventory_number": format!("API-{}", suffix())
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 403);
}

#[tokio::test]
#[ignore]
async fn test_equipment_types_are_listed() {
    let client = Client::new();

    let response = client
        .get(format!("{}/systems/zamar/equipment-types", BASE_URL))
        .bearer_auth(token(Role::Viewer))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse response");
    let codes: Vec<&str> = body
        .as_array()
        .expect("Expected an array")
        .iter()
        .filter_map(|t| t["code"].as_str())
        .collect();
    assert!(codes.contains(&"tablet"));
}

#[tokio::test]
#[ignore]
async fn test_zamar_equipment_requires_serial() {
    let client = Client::new();

    let response = client
        .post(format!("{}/systems/zamar/equipment", BASE_URL))
        .bearer_auth(token(Role::Editor))
        .json(&json!({
            "equipment_type": "tablet",
            "inventory_number": format!("API-{}", suffix())
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["error"], "BadValue");
    assert_eq!(body["code"], 5);
}

#[tokio::test]
#[ignore]
async fn test_bind_flow_and_repair_batch() {
    let client = Client::new();
    let editor = token(Role::Editor);
    let tag = suffix();

    let installation: Value = client
        .post(format!("{}/systems/fids/installations", BASE_URL))
        .bearer_auth(&editor)
        .json(&json!({
            "name": format!("Zone {}", tag),
            "installation_type": "display_zone",
            "terminal": "terminal_b"
        }))
        .send()
        .await
        .expect("Failed to create installation")
        .json()
        .await
        .expect("Failed to parse installation");
    let installation_id = installation["id"].as_i64().expect("installation id");

    let serial = format!("SN-{}", tag);
    let equipment: Value = client
        .post(format!("{}/systems/fids/equipment", BASE_URL))
        .bearer_auth(&editor)
        .json(&json!({
            "equipment_type": "monitor",
            "inventory_number": format!("API-{}", tag),
            "serial_number": serial
        }))
        .send()
        .await
        .expect("Failed to create equipment")
        .json()
        .await
        .expect("Failed to parse equipment");
    let equipment_id = equipment["id"].as_i64().expect("equipment id");

    let search: Value = client
        .get(format!(
            "{}/systems/fids/installations/{}/search-equipment",
            BASE_URL, installation_id
        ))
        .query(&[("serial_number", serial.as_str())])
        .bearer_auth(&editor)
        .send()
        .await
        .expect("Failed to search")
        .json()
        .await
        .expect("Failed to parse search");
    assert_eq!(search["equipment"]["id"], equipment_id);

    let attached = client
        .post(format!(
            "{}/systems/fids/installations/{}/attach",
            BASE_URL, installation_id
        ))
        .bearer_auth(&editor)
        .json(&json!({ "equipment_id": equipment_id }))
        .send()
        .await
        .expect("Failed to attach");
    assert!(attached.status().is_success());
    let attached: Value = attached.json().await.expect("Failed to parse attach");
    assert_eq!(attached["status"], "active");

    let detached: Value = client
        .post(format!(
            "{}/systems/fids/installations/{}/detach",
            BASE_URL, installation_id
        ))
        .bearer_auth(&editor)
        .json(&json!({ "equipment_id": equipment_id }))
        .send()
        .await
        .expect("Failed to detach")
        .json()
        .await
        .expect("Failed to parse detach");
    assert_eq!(detached["status"], "ready_to_dispatch");

    let created = client
        .post(format!("{}/repairs", BASE_URL))
        .bearer_auth(&editor)
        .json(&json!({
            "items": [{ "system": "fids", "id": equipment_id }],
            "notes": "Dead pixels"
        }))
        .send()
        .await
        .expect("Failed to create batch");
    assert_eq!(created.status(), 201);
    let created: Value = created.json().await.expect("Failed to parse batch");
    assert!(created["repair_number"]
        .as_str()
        .is_some_and(|n| n.starts_with("REP-")));
    assert_eq!(created["equipment_count"], 1);

    let history: Value = client
        .get(format!("{}/repairs/history", BASE_URL))
        .query(&[("serial_number", serial.as_str())])
        .bearer_auth(&editor)
        .send()
        .await
        .expect("Failed to fetch history")
        .json()
        .await
        .expect("Failed to parse history");
    assert_eq!(history["total_repairs"], 1);
}

#[tokio::test]
#[ignore]
async fn test_empty_batch_is_rejected() {
    let client = Client::new();

    let response = client
        .post(format!("{}/repairs", BASE_URL))
        .bearer_auth(token(Role::Editor))
        .json(&json!({ "items": [] }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 400);
}
