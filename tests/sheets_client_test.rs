//! Google Sheets client tests against mock Google APIs
//!
//! Covers the service-account token exchange, spreadsheet resolution by
//! name, worksheet lookup and row appends.

mod helpers;

use std::sync::Arc;
use assert_matches::assert_matches;
use serde_json::json;
use serial_test::serial;
use tempfile::TempDir;
use wiremock::{
    matchers::{body_json, body_string_contains, header, method, path, path_regex, query_param},
    Mock, MockServer, ResponseTemplate,
};
use helpers::*;
use RegBot::config::GoogleConfig;
use RegBot::services::{RecordSink, RegistrationService, ServiceAccountKey, SheetsService};
use RegBot::state::{FieldValue, MemorySessionStore, RegistrationRecord, SessionStore};
use RegBot::utils::errors::{BotError, SheetsError};

const ACCESS_TOKEN: &str = "ya29.test-token";

/// Write a service-account key whose token endpoint is the mock server
fn write_key_file(server: &MockServer) -> (TempDir, String) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let key_path = dir.path().join("credentials.json");
    let key = json!({
        "type": "service_account",
        "project_id": "regbot-test",
        "private_key_id": "abc123",
        "private_key": test_private_key(),
        "client_email": "regbot@regbot-test.iam.gserviceaccount.com",
        "token_uri": format!("{}/token", server.uri()),
    });
    std::fs::write(&key_path, key.to_string()).expect("Failed to write key file");

    (dir, key_path.to_string_lossy().into_owned())
}

fn google_config(server: &MockServer, key_path: String) -> GoogleConfig {
    GoogleConfig {
        service_account_path: key_path,
        sheets_api_url: server.uri(),
        drive_api_url: server.uri(),
        timeout_seconds: 5,
        ..GoogleConfig::default()
    }
}

async fn mock_token(server: &MockServer, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Ajwt-bearer"))
        .and(body_string_contains("assertion="))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": ACCESS_TOKEN,
            "expires_in": 3599,
            "token_type": "Bearer"
        })))
        .expect(expected_calls)
        .mount(server)
        .await;
}

async fn mock_drive_lookup(server: &MockServer, files: serde_json::Value, expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .and(header("authorization", format!("Bearer {}", ACCESS_TOKEN).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "files": files })))
        .expect(expected_calls)
        .mount(server)
        .await;
}

async fn mock_metadata(server: &MockServer, spreadsheet_id: &str, expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path(format!("/v4/spreadsheets/{}", spreadsheet_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "sheets": [
                {"properties": {"title": "Sheet1"}},
                {"properties": {"title": "Archive"}}
            ]
        })))
        .expect(expected_calls)
        .mount(server)
        .await;
}

fn jane() -> RegistrationRecord {
    RegistrationRecord {
        name: Some("Jane Doe".to_string()),
        age: Some(29),
        email: Some("jane@example.com".to_string()),
    }
}

#[tokio::test]
#[serial]
async fn test_append_resolves_sheet_by_name_and_reuses_token() {
    init_test_env();
    let server = MockServer::start().await;
    let (_dir, key_path) = write_key_file(&server);

    mock_token(&server, 1).await;
    mock_drive_lookup(&server, json!([{"id": "sheet-123", "name": "UserData"}]), 1).await;
    mock_metadata(&server, "sheet-123", 1).await;

    Mock::given(method("POST"))
        .and(path_regex(r"^/v4/spreadsheets/sheet-123/values/.+:append$"))
        .and(header("authorization", format!("Bearer {}", ACCESS_TOKEN).as_str()))
        .and(query_param("valueInputOption", "RAW"))
        .and(query_param("insertDataOption", "INSERT_ROWS"))
        .and(body_json(json!({"values": [["Jane Doe", 29, "jane@example.com"]]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "spreadsheetId": "sheet-123",
            "updates": {"updatedRows": 1}
        })))
        .expect(2)
        .mount(&server)
        .await;

    let sheets = SheetsService::new(google_config(&server, key_path)).await.unwrap();

    sheets.append_record(&jane()).await.unwrap();
    sheets.append_record(&jane()).await.unwrap();

    let target = sheets.target().await.unwrap();
    assert_eq!(target.spreadsheet_id, "sheet-123");
    assert_eq!(target.sheet_title, "Sheet1");
}

#[tokio::test]
#[serial]
async fn test_configured_spreadsheet_id_skips_drive_lookup() {
    let server = MockServer::start().await;
    let (_dir, key_path) = write_key_file(&server);

    mock_token(&server, 1).await;
    mock_drive_lookup(&server, json!([]), 0).await;
    mock_metadata(&server, "configured-id", 1).await;

    Mock::given(method("POST"))
        .and(path_regex(r"^/v4/spreadsheets/configured-id/values/.+:append$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let config = GoogleConfig {
        spreadsheet_id: Some("configured-id".to_string()),
        ..google_config(&server, key_path)
    };
    let sheets = SheetsService::new(config).await.unwrap();

    sheets.append_record(&jane()).await.unwrap();
}

#[tokio::test]
#[serial]
async fn test_missing_spreadsheet_is_reported() {
    let server = MockServer::start().await;
    let (_dir, key_path) = write_key_file(&server);

    mock_token(&server, 1).await;
    mock_drive_lookup(&server, json!([]), 1).await;

    let sheets = SheetsService::new(google_config(&server, key_path)).await.unwrap();

    assert_matches!(
        sheets.append_record(&jane()).await,
        Err(SheetsError::SpreadsheetNotFound(name)) if name == "UserData"
    );
}

#[tokio::test]
#[serial]
async fn test_rejected_token_exchange_is_auth_error() {
    let server = MockServer::start().await;
    let (_dir, key_path) = write_key_file(&server);

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Invalid JWT Signature."
        })))
        .mount(&server)
        .await;

    let sheets = SheetsService::new(google_config(&server, key_path)).await.unwrap();

    assert_matches!(
        sheets.append_record(&jane()).await,
        Err(SheetsError::Auth(msg)) if msg.contains("invalid_grant")
    );
}

#[tokio::test]
#[serial]
async fn test_append_failure_is_api_error() {
    let server = MockServer::start().await;
    let (_dir, key_path) = write_key_file(&server);

    mock_token(&server, 1).await;
    mock_drive_lookup(&server, json!([{"id": "sheet-123"}]), 1).await;
    mock_metadata(&server, "sheet-123", 1).await;

    Mock::given(method("POST"))
        .and(path_regex(r"^/v4/spreadsheets/sheet-123/values/.+:append$"))
        .respond_with(ResponseTemplate::new(429).set_body_string("Quota exceeded"))
        .mount(&server)
        .await;

    let sheets = SheetsService::new(google_config(&server, key_path)).await.unwrap();

    assert_matches!(
        sheets.append_record(&jane()).await,
        Err(SheetsError::Api(msg)) if msg.contains("429") && msg.contains("Quota exceeded")
    );
}

#[tokio::test]
#[serial]
async fn test_malformed_key_file_is_credentials_error() {
    let dir = tempfile::tempdir().unwrap();
    let key_path = dir.path().join("credentials.json");
    std::fs::write(&key_path, "{\"client_email\": 42}").unwrap();

    let result = ServiceAccountKey::from_file(&key_path).await;
    assert_matches!(result, Err(SheetsError::Credentials(_)));
}

#[tokio::test]
#[serial]
async fn test_registration_through_sheets_ends_session_on_failure() {
    let server = MockServer::start().await;
    let (_dir, key_path) = write_key_file(&server);

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let sessions = Arc::new(MemorySessionStore::new(0));
    let sheets = Arc::new(SheetsService::new(google_config(&server, key_path)).await.unwrap());
    let registration = RegistrationService::new(sessions.clone(), sheets);
    let user = test_user_id();

    registration.start(user).await.unwrap();
    sessions.set_field(user, FieldValue::Name("Jane Doe".into())).await.unwrap();
    sessions.set_field(user, FieldValue::Age(29)).await.unwrap();

    let session = sessions.get(user).await.unwrap().unwrap();
    let result = registration.handle_input(&session, "jane@example.com").await;

    assert_matches!(result, Err(BotError::Persistence(SheetsError::Auth(_))));
    assert!(sessions.get(user).await.unwrap().is_none());
}
