//! Integration tests using mock HTTP server
//!
//! Tests the full end-to-end flow: config → token exchange → paged requests →
//! Singer messages and persisted state

use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tap_apaleo::state::StateManager;
use tap_apaleo::{Error, Message, StreamDescriptor, SyncConfig, Tap, TapConfig};
use tempfile::tempdir;
use wiremock::matchers::{body_string_contains, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PROPERTIES: &str = "/inventory/v1/properties";
const RESERVATIONS: &str = "/booking/v1/reservations";
const UNITS: &str = "/inventory/v1/units";
const MAINTENANCES: &str = "/operations/v1/maintenances";

fn config_for(server: &MockServer) -> TapConfig {
    let mut config = TapConfig::new(
        "client",
        "secret",
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
    );
    config.api_url = server.uri();
    config.auth_url = format!("{}/connect/token", server.uri());
    config.requests_per_second = 0;
    config.max_retries = 1;
    config
}

async fn mount_token(server: &MockServer, expected_exchanges: u64) {
    Mock::given(method("POST"))
        .and(path("/connect/token"))
        .and(body_string_contains("grant_type=client_credentials"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "tok",
            "token_type": "Bearer",
            "expires_in": 3600
        })))
        .expect(expected_exchanges)
        .mount(server)
        .await;
}

fn page(key: &str, records: Value, count: u64) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ key: records, "count": count }))
}

fn kinds(messages: &[Message]) -> Vec<String> {
    messages
        .iter()
        .map(|m| match m {
            Message::Schema { stream, .. } => format!("SCHEMA {stream}"),
            Message::Record { stream, .. } => format!("RECORD {stream}"),
            Message::State { .. } => "STATE".to_string(),
        })
        .collect()
}

// ============================================================================
// check / discover
// ============================================================================

#[tokio::test]
async fn test_check_succeeds() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;

    Mock::given(method("GET"))
        .and(path(PROPERTIES))
        .and(query_param("pageSize", "1"))
        .respond_with(page("properties", json!([{"id": "MUC"}]), 12))
        .expect(1)
        .mount(&server)
        .await;

    let tap = Tap::new(config_for(&server), StateManager::in_memory()).unwrap();
    let result = tap.check().await;

    assert!(result.success, "{:?}", result.message);
}

#[tokio::test]
async fn test_check_reports_bad_credentials() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/connect/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"error": "invalid_client"})))
        .mount(&server)
        .await;

    let tap = Tap::new(config_for(&server), StateManager::in_memory()).unwrap();
    let result = tap.check().await;

    assert!(!result.success);
    assert!(result.message.unwrap().contains("invalid_client"));
}

#[test]
fn test_discover_without_network() {
    let config = TapConfig::new("client", "secret", Utc::now());
    let tap = Tap::new(config, StateManager::in_memory()).unwrap();

    let doc = tap.discover();
    let names: Vec<&str> = doc["streams"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|s| s["stream"].as_str())
        .collect();

    assert_eq!(
        names,
        vec!["properties", "reservations", "unit_groups", "units", "rate_plans", "maintenances"]
    );
}

// ============================================================================
// sync
// ============================================================================

#[tokio::test]
async fn test_sync_emits_messages_in_order_with_one_token() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;

    Mock::given(method("GET"))
        .and(path(PROPERTIES))
        .respond_with(page("properties", json!([{"id": "MUC"}, {"id": "BER"}]), 2))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(RESERVATIONS))
        .and(query_param("from", "2024-01-01T00:00:00Z"))
        .and(query_param("dateFilter", "Modification"))
        .and(query_param("sort", "modified:asc"))
        .respond_with(page(
            "reservations",
            json!([{"id": "R1", "modified": "2024-02-01T00:00:00Z"}]),
            1,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let tap = Tap::new(config_for(&server), StateManager::in_memory()).unwrap();
    let mut sink: Vec<Message> = Vec::new();

    let report = tap
        .sync(Some("reservations,properties"), SyncConfig::default(), &mut sink)
        .await
        .unwrap();

    assert!(report.is_success());
    assert_eq!(report.total_records(), 3);
    assert_eq!(
        kinds(&sink),
        vec![
            "SCHEMA properties",
            "RECORD properties",
            "RECORD properties",
            "SCHEMA reservations",
            "RECORD reservations",
            "STATE",
        ]
    );

    let Some(Message::State { value }) = sink.last() else {
        panic!("expected final state");
    };
    assert_eq!(
        value,
        &json!({
            "bookmarks": {
                "reservations": {
                    "replication_key": "modified",
                    "replication_key_value": "2024-02-01T00:00:00Z"
                }
            }
        })
    );
    assert_eq!(tap.tokens().exchange_count(), 1);
}

#[tokio::test]
async fn test_failed_stream_does_not_stop_the_rest() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;

    Mock::given(method("GET"))
        .and(path(UNITS))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(MAINTENANCES))
        .respond_with(page("maintenances", json!([{"id": "M1"}]), 1))
        .expect(1)
        .mount(&server)
        .await;

    let tap = Tap::new(config_for(&server), StateManager::in_memory()).unwrap();
    let mut sink: Vec<Message> = Vec::new();

    let report = tap
        .sync(Some("units,maintenances"), SyncConfig::default(), &mut sink)
        .await
        .unwrap();

    assert!(!report.is_success());
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].stream, "units");
    assert_eq!(report.completed.len(), 1);
    assert_eq!(report.completed[0].stream, "maintenances");
    assert!(sink.last().unwrap().is_state());
}

#[tokio::test]
async fn test_auth_failure_aborts_run() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/connect/token"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(page("units", json!([]), 0))
        .expect(0)
        .mount(&server)
        .await;

    let tap = Tap::new(config_for(&server), StateManager::in_memory()).unwrap();
    let mut sink: Vec<Message> = Vec::new();

    let err = tap
        .sync(Some("units,maintenances"), SyncConfig::default(), &mut sink)
        .await
        .unwrap_err();

    assert!(err.is_auth());
    assert_eq!(kinds(&sink), vec!["SCHEMA units", "STATE"]);
}

#[tokio::test]
async fn test_unknown_stream_selection() {
    let server = MockServer::start().await;
    let tap = Tap::new(config_for(&server), StateManager::in_memory()).unwrap();
    let mut sink: Vec<Message> = Vec::new();

    let err = tap
        .sync(Some("guests"), SyncConfig::default(), &mut sink)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::StreamNotFound { .. }));
    assert!(sink.is_empty());
}

#[tokio::test]
async fn test_post_processor_drops_records() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;

    Mock::given(method("GET"))
        .and(path(UNITS))
        .respond_with(page(
            "units",
            json!([{"id": "U1", "status": {"isOccupied": true}}, {"id": "U2"}]),
            2,
        ))
        .mount(&server)
        .await;

    let tap = Tap::new(config_for(&server), StateManager::in_memory())
        .unwrap()
        .with_post_processor(|_: &StreamDescriptor, record: Value| {
            record.get("status").is_none().then_some(record)
        });
    let mut sink: Vec<Message> = Vec::new();

    let report = tap
        .sync(Some("units"), SyncConfig::default(), &mut sink)
        .await
        .unwrap();

    assert_eq!(report.total_records(), 1);
    assert_eq!(kinds(&sink), vec!["SCHEMA units", "RECORD units", "STATE"]);
}

// ============================================================================
// Resumability
// ============================================================================

#[tokio::test]
async fn test_state_file_round_trip() {
    let server = MockServer::start().await;
    mount_token(&server, 2).await;

    Mock::given(method("GET"))
        .and(path(RESERVATIONS))
        .and(query_param("from", "2024-01-01T00:00:00Z"))
        .and(query_param_is_missing("pageNumber"))
        .respond_with(page(
            "reservations",
            json!([
                {"id": "R1", "modified": "2024-03-01T00:00:00Z"},
                {"id": "R2", "modified": "2024-06-01T00:00:00Z"}
            ]),
            2,
        ))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(RESERVATIONS))
        .and(query_param("from", "2024-06-01T00:00:00Z"))
        .respond_with(page("reservations", json!([]), 0))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let state_path = dir.path().join("state.json");

    let first = Tap::new(config_for(&server), StateManager::from_file(&state_path).unwrap()).unwrap();
    let mut sink: Vec<Message> = Vec::new();
    first
        .sync(Some("reservations"), SyncConfig::default(), &mut sink)
        .await
        .unwrap();

    let written: Value =
        serde_json::from_str(&std::fs::read_to_string(&state_path).unwrap()).unwrap();
    assert_eq!(
        written["bookmarks"]["reservations"]["replication_key_value"],
        "2024-06-01T00:00:00Z"
    );

    let second =
        Tap::new(config_for(&server), StateManager::from_file(&state_path).unwrap()).unwrap();
    let mut sink: Vec<Message> = Vec::new();
    let report = second
        .sync(Some("reservations"), SyncConfig::default(), &mut sink)
        .await
        .unwrap();

    assert_eq!(report.total_records(), 0);
    assert_eq!(
        second
            .state()
            .get_bookmark("reservations")
            .await
            .and_then(|b| b.value_str().map(str::to_string))
            .as_deref(),
        Some("2024-06-01T00:00:00Z")
    );
}

#[tokio::test]
async fn test_three_pages_for_count_2500() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;

    for (page_number, id) in [(None, "P1"), (Some("2"), "P2"), (Some("3"), "P3")] {
        let mock = Mock::given(method("GET")).and(path(PROPERTIES));
        let mock = match page_number {
            Some(n) => mock.and(query_param("pageNumber", n)),
            None => mock.and(query_param_is_missing("pageNumber")),
        };
        mock.respond_with(page("properties", json!([{ "id": id }]), 2500))
            .expect(1)
            .mount(&server)
            .await;
    }

    let tap = Tap::new(config_for(&server), StateManager::in_memory()).unwrap();
    let mut sink: Vec<Message> = Vec::new();
    let report = tap
        .sync(Some("properties"), SyncConfig::default(), &mut sink)
        .await
        .unwrap();

    assert_eq!(report.completed[0].pages_fetched, 3);
    assert_eq!(report.total_records(), 3);
}
