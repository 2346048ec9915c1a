use std::sync::Arc;

use assert_matches::assert_matches;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use clinic_cell::{clinic_routes, ClinicQuery, ClinicService};
use shared_config::AppConfig;
use shared_models::error::AppError;

fn config(server: &MockServer) -> AppConfig {
    AppConfig {
        overpass_api_url: format!("{}/api/interpreter", server.uri()),
        ip_geolocation_url: format!("{}/json/", server.uri()),
        remote_poll_interval_secs: 0,
        ..AppConfig::default()
    }
}

fn overpass_body() -> Value {
    json!({
        "version": 0.6,
        "elements": [
            { "type": "node", "id": 11, "lat": 40.7300, "lon": -73.9900, "tags": { "amenity": "hospital", "name": "Far Hospital", "emergency": "yes" } },
            { "type": "node", "id": 12, "lat": 40.7130, "lon": -74.0060, "tags": { "amenity": "clinic", "name": "Near Clinic" } },
            { "type": "node", "id": 13, "lat": 40.7200, "lon": -74.0000, "tags": { "amenity": "clinic" } }
        ]
    })
}

#[tokio::test]
async fn test_search_with_coordinates() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/interpreter"))
        .respond_with(ResponseTemplate::new(200).set_body_json(overpass_body()))
        .expect(1)
        .mount(&server)
        .await;

    let service = ClinicService::new(&config(&server));
    let search = service
        .search(ClinicQuery { lat: Some(40.7128), lng: Some(-74.0060), q: None })
        .await
        .unwrap();

    let names: Vec<&str> = search.clinics.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Near Clinic", "Unnamed Clinic", "Far Hospital"]);
    assert!(search.clinics[2].emergency);
}

#[tokio::test]
async fn test_search_falls_back_to_ip_location() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/json/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ip": "203.0.113.7",
            "latitude": 40.7128,
            "longitude": -74.0060
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/interpreter"))
        .respond_with(ResponseTemplate::new(200).set_body_json(overpass_body()))
        .mount(&server)
        .await;

    let service = ClinicService::new(&config(&server));
    let search = service
        .search(ClinicQuery { lat: None, lng: None, q: Some("clinic".into()) })
        .await
        .unwrap();

    assert_eq!(search.origin.lat, 40.7128);
    assert_eq!(search.clinics.len(), 2);
}

#[tokio::test]
async fn test_upstream_failure_is_external_service_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/interpreter"))
        .respond_with(ResponseTemplate::new(504))
        .mount(&server)
        .await;

    let service = ClinicService::new(&config(&server));
    let result = service
        .search(ClinicQuery { lat: Some(1.0), lng: Some(1.0), q: None })
        .await;

    assert_matches!(result, Err(AppError::ExternalService(_)));
}

#[tokio::test]
async fn test_route_rejects_half_coordinates() {
    let server = MockServer::start().await;
    let config = Arc::new(config(&server));
    let app = clinic_routes(config.clone(), Arc::new(ClinicService::new(&config)));

    let response = app
        .oneshot(Request::builder().uri("/?lat=40.7").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert!(body["error"].as_str().unwrap().contains("together"));
}
