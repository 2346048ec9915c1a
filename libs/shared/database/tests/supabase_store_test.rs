use assert_matches::assert_matches;
use serde_json::json;
use wiremock::{MockServer, Mock, ResponseTemplate};
use wiremock::matchers::{body_json, header, method, path, query_param};

use shared_config::AppConfig;
use shared_database::{DocumentRef, DocumentStore, SupabaseDocumentStore};

fn config_for(server: &MockServer) -> AppConfig {
    AppConfig {
        supabase_url: server.uri(),
        supabase_anon_key: "test-anon-key".to_string(),
        ..AppConfig::default()
    }
}

#[tokio::test]
async fn test_load_returns_first_row() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .and(query_param("id", "eq.demoUser"))
        .and(header("apikey", "test-anon-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": "demoUser", "medications": [{ "id": 1, "name": "Lisinopril" }] }
        ])))
        .mount(&mock_server)
        .await;

    let store = SupabaseDocumentStore::new(&config_for(&mock_server));
    let doc = store.load(&DocumentRef::new("users", "demoUser")).await.unwrap();

    assert_matches!(doc, Some(value) if value["medications"][0]["name"] == "Lisinopril");
}

#[tokio::test]
async fn test_load_missing_row_is_none() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/medical_history"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let store = SupabaseDocumentStore::new(&config_for(&mock_server));
    let doc = store.load(&DocumentRef::new("medical_history", "demoUser")).await.unwrap();

    assert!(doc.is_none());
}

#[tokio::test]
async fn test_merge_upserts_only_given_fields() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/users"))
        .and(query_param("on_conflict", "id"))
        .and(header("Prefer", "resolution=merge-duplicates,return=minimal"))
        .and(body_json(json!({ "id": "demoUser", "medications": [] })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&mock_server)
        .await;

    let store = SupabaseDocumentStore::new(&config_for(&mock_server));
    let fields = json!({ "medications": [] }).as_object().cloned().unwrap();

    store.merge(&DocumentRef::new("users", "demoUser"), fields).await.unwrap();
}

#[tokio::test]
async fn test_merge_surfaces_api_errors() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .mount(&mock_server)
        .await;

    let store = SupabaseDocumentStore::new(&config_for(&mock_server));
    let fields = json!({ "medications": [] }).as_object().cloned().unwrap();

    let err = store.merge(&DocumentRef::new("users", "demoUser"), fields).await.unwrap_err();
    assert!(err.to_string().contains("Authentication error"));
}

#[tokio::test]
async fn test_service_key_is_sent_as_bearer() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .and(header("Authorization", "Bearer service-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = AppConfig {
        supabase_service_key: Some("service-key".to_string()),
        ..config_for(&mock_server)
    };
    let store = SupabaseDocumentStore::new(&config);

    assert!(store.load(&DocumentRef::new("users", "demoUser")).await.unwrap().is_none());
}
