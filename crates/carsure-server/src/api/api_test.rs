use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use carsure_assess::{AnalysisPipeline, DisabledDetector, MockProvider};
use carsure_core::{AiProvider, AppConfig, Environment};
use carsure_firebase::{FirebaseClient, StaticTokenVerifier, VerifiedUser};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{any, method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::*;

const GOOD_TOKEN: &str = "good-token";
const BOUNDARY: &str = "carsure-test-boundary";

fn test_config(database_url: &str, admin_uids: &[&str]) -> AppConfig {
    AppConfig {
        env: Environment::Test,
        dev_mode: false,
        bind_addr: "127.0.0.1:0".parse().expect("socket addr"),
        log_level: "info".to_string(),
        firebase_database_url: database_url.to_string(),
        firebase_project_id: None,
        firebase_api_key: None,
        firebase_list_timeout_secs: 4,
        gemini_api_keys: Vec::new(),
        gemini_model: "gemini-1.5-flash".to_string(),
        gemini_timeout_secs: 60,
        ai_provider: AiProvider::Mock,
        detector_url: None,
        detector_enabled: false,
        admin_uids: admin_uids.iter().map(|s| (*s).to_string()).collect(),
        store_raw_image: false,
        max_upload_bytes: 1024 * 1024,
    }
}

fn verifier() -> StaticTokenVerifier {
    StaticTokenVerifier::new().with_token(
        GOOD_TOKEN,
        VerifiedUser {
            uid: "u1".to_string(),
            email: Some("driver@example.com".to_string()),
            display_name: Some("Driver".to_string()),
            email_verified: true,
        },
    )
}

struct TestApp {
    config: AppConfig,
    provider: MockProvider,
    dev_bypass: bool,
    rate_limit: RateLimitState,
}

impl TestApp {
    fn new(server: &MockServer) -> Self {
        Self {
            config: test_config(&server.uri(), &[]),
            provider: MockProvider::new(),
            dev_bypass: false,
            rate_limit: default_rate_limit_state(),
        }
    }

    fn build(self) -> Router {
        let firebase = FirebaseClient::new(&self.config.firebase_database_url, 5, 4)
            .expect("firebase client");
        let auth = AuthState::new(
            Arc::new(verifier()),
            self.dev_bypass,
            &self.config.admin_uids,
        );
        let state = AppState {
            config: Arc::new(self.config),
            firebase: Arc::new(firebase),
            pipeline: AnalysisPipeline::new(Arc::new(self.provider), Arc::new(DisabledDetector)),
        };
        build_app(state, auth, self.rate_limit)
    }
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).expect("request")
}

fn multipart_upload(field: &str, filename: &str, bytes: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: image/jpeg\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/api/analyze-damage")
        .header(header::AUTHORIZATION, format!("Bearer {GOOD_TOKEN}"))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .expect("request")
}

async fn json_body(response: axum::response::Response) -> Value {
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    serde_json::from_slice(&body).expect("json parse")
}

async fn mount_writable_database(server: &MockServer) {
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("null"))
        .mount(server)
        .await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(server)
        .await;
}

const JPEG_BYTES: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F'];

#[test]
fn normalize_limit_applies_defaults_and_bounds() {
    assert_eq!(normalize_limit(None, 50, 200), 50);
    assert_eq!(normalize_limit(Some(0), 50, 200), 1);
    assert_eq!(normalize_limit(Some(1_000), 50, 200), 200);
    assert_eq!(normalize_limit(Some(25), 50, 200), 25);
}

#[test]
fn api_error_codes_map_to_statuses() {
    let cases = [
        ("validation_error", StatusCode::BAD_REQUEST),
        ("unauthorized", StatusCode::UNAUTHORIZED),
        ("forbidden", StatusCode::FORBIDDEN),
        ("internal_error", StatusCode::INTERNAL_SERVER_ERROR),
    ];
    for (code, status) in cases {
        let response = ApiError::new("req-1", code, "message").into_response();
        assert_eq!(response.status(), status, "code {code}");
    }
}

#[test]
fn api_error_omits_absent_details() {
    let plain = serde_json::to_value(ApiError::new("req-1", "internal_error", "boom")).expect("json");
    assert!(plain["error"].get("details").is_none());

    let detailed = serde_json::to_value(
        ApiError::new("req-1", "internal_error", "boom").with_details("upstream 503"),
    )
    .expect("json");
    assert_eq!(detailed["error"]["details"], "upstream 503");
}

#[tokio::test]
async fn health_is_public_and_echoes_request_id() {
    let server = MockServer::start().await;
    let app = TestApp::new(&server).build();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/health")
                .header("x-request-id", "req-abc")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("x-request-id").and_then(|v| v.to_str().ok()),
        Some("req-abc")
    );
    let json = json_body(response).await;
    assert_eq!(json["data"]["status"], "ok");
    assert_eq!(json["data"]["ai_provider"], "mock");
    assert_eq!(json["meta"]["request_id"], "req-abc");
}

#[tokio::test]
async fn protected_routes_require_a_valid_token() {
    let server = MockServer::start().await;

    let missing = TestApp::new(&server)
        .build()
        .oneshot(get("/api/profile", None))
        .await
        .expect("response");
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

    let invalid = TestApp::new(&server)
        .build()
        .oneshot(get("/api/profile", Some("forged")))
        .await
        .expect("response");
    assert_eq!(invalid.status(), StatusCode::UNAUTHORIZED);
    let json = json_body(invalid).await;
    assert_eq!(json["error"]["code"], "unauthorized");
}

#[tokio::test]
async fn dev_bypass_header_is_honoured_only_when_enabled() {
    let server = MockServer::start().await;
    mount_writable_database(&server).await;

    let bypass_request = || {
        Request::builder()
            .uri("/api/profile")
            .header("X-Dev-Auth-Bypass", "true")
            .body(Body::empty())
            .expect("request")
    };

    let mut dev = TestApp::new(&server);
    dev.dev_bypass = true;
    let response = dev.build().oneshot(bypass_request()).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["data"]["uid"], "dev-user");

    let response = TestApp::new(&server)
        .build()
        .oneshot(bypass_request())
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn analyze_damage_returns_assessment_and_stores_record() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path_regex(r"^/users/u1/analysis_history/[0-9a-f-]+\.json$"))
        .and(query_param("auth", GOOD_TOKEN))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/users/u1/profile/total_analyses.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(2)))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/users/u1/profile/total_analyses.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(3)))
        .expect(1)
        .mount(&server)
        .await;

    let response = TestApp::new(&server)
        .build()
        .oneshot(multipart_upload("image", "swift.jpg", JPEG_BYTES))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    let data = &json["data"];
    assert_eq!(data["demo_mode"], false);
    assert_eq!(data["structured_data"]["analysisMode"], "success");
    assert!(data["raw_analysis"].as_str().is_some_and(|s| !s.is_empty()));
    assert!(data["record_id"].as_str().is_some_and(|s| !s.is_empty()));
}

#[tokio::test]
async fn analyze_damage_still_answers_when_storage_fails() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let response = TestApp::new(&server)
        .build()
        .oneshot(multipart_upload("image", "swift.jpg", JPEG_BYTES))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert!(json["data"]["record_id"].is_null());
    assert_eq!(json["data"]["structured_data"]["analysisMode"], "success");
}

#[tokio::test]
async fn analyze_damage_quota_exhaustion_yields_demo_result() {
    let server = MockServer::start().await;
    mount_writable_database(&server).await;

    let mut app = TestApp::new(&server);
    app.provider = MockProvider::quota_exhausted();
    let response = app
        .build()
        .oneshot(multipart_upload("image", "car.jpg", JPEG_BYTES))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["data"]["demo_mode"], true);
    assert_eq!(json["data"]["structured_data"]["demo_mode"], true);
    assert_eq!(json["data"]["structured_data"]["analysisMode"], "quota_fallback");
}

#[tokio::test]
async fn analyze_damage_provider_failure_is_500_with_details() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&server)
        .await;

    let mut app = TestApp::new(&server);
    app.provider = MockProvider::failing("model overloaded");
    let response = app
        .build()
        .oneshot(multipart_upload("image", "car.jpg", JPEG_BYTES))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = json_body(response).await;
    assert_eq!(json["error"]["code"], "internal_error");
    assert!(json["error"]["details"]
        .as_str()
        .is_some_and(|d| d.contains("model overloaded")));
}

#[tokio::test]
async fn analyze_damage_without_image_field_is_400() {
    let server = MockServer::start().await;

    let response = TestApp::new(&server)
        .build()
        .oneshot(multipart_upload("document", "car.jpg", JPEG_BYTES))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert_eq!(json["error"]["code"], "validation_error");
    assert_eq!(json["error"]["message"], "no image file provided");
}

#[tokio::test]
async fn analyze_damage_with_empty_file_is_400() {
    let server = MockServer::start().await;

    let response = TestApp::new(&server)
        .build()
        .oneshot(multipart_upload("image", "car.jpg", b""))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn history_returns_callers_records_newest_first() {
    let server = MockServer::start().await;
    let record = |id: &str, at: &str| {
        json!({
            "id": id,
            "userId": "u1",
            "uploadedAt": at,
            "filename": "car.jpg",
            "imageHash": "00",
            "structuredData": carsure_assess::build_no_damage_result(
                carsure_assess::extract::VehicleFields::unknown(),
                0.9,
            ),
            "rawAnalysis": "No visible damage",
        })
    };
    Mock::given(method("GET"))
        .and(path("/users/u1/analysis_history.json"))
        .and(query_param("limitToLast", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "old": record("old", "2024-01-01T00:00:00Z"),
            "new": record("new", "2024-06-01T00:00:00Z"),
        })))
        .mount(&server)
        .await;

    let response = TestApp::new(&server)
        .build()
        .oneshot(get("/api/analysis/history?limit=5", Some(GOOD_TOKEN)))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    let ids: Vec<&str> = json["data"]
        .as_array()
        .expect("data array")
        .iter()
        .filter_map(|r| r["id"].as_str())
        .collect();
    assert_eq!(ids, vec!["new", "old"]);
}

#[tokio::test]
async fn admin_dashboard_forbids_non_admins() {
    let server = MockServer::start().await;
    let mut app = TestApp::new(&server);
    app.config = test_config(&server.uri(), &["boss"]);

    let response = app
        .build()
        .oneshot(get("/api/admin/aggregated-dashboard-data", Some(GOOD_TOKEN)))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn admin_dashboard_serves_empty_payload_when_database_is_down() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    let mut app = TestApp::new(&server);
    app.config = test_config(&server.uri(), &["u1"]);

    let response = app
        .build()
        .oneshot(get("/api/admin/aggregated-dashboard-data", Some(GOOD_TOKEN)))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["data"]["dataSource"], "empty");
    assert_eq!(json["data"]["totalAnalyses"], 0);
    assert_eq!(json["data"]["recentAnalyses"], json!([]));
}

#[tokio::test]
async fn admin_dashboard_aggregates_stored_history() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users.json"))
        .and(query_param("shallow", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "u1": true, "u2": true })))
        .mount(&server)
        .await;
    for uid in ["u1", "u2"] {
        Mock::given(method("GET"))
            .and(path(format!("/users/{uid}/analysis_history.json")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "r1": {
                    "id": format!("{uid}-r1"),
                    "uploadedAt": "2024-05-01T10:00:00Z",
                    "structuredData": { "damageType": "Dent", "severity": "minor", "confidence": 0.8 }
                }
            })))
            .mount(&server)
            .await;
    }

    let response = TestApp::new(&server)
        .build()
        .oneshot(get(
            "/api/admin/aggregated-dashboard-data?max_users=10&limit=5",
            Some(GOOD_TOKEN),
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["data"]["dataSource"], "firebase");
    assert_eq!(json["data"]["totalUsers"], 2);
    assert_eq!(json["data"]["totalAnalyses"], 2);
}

#[tokio::test]
async fn user_dashboard_with_no_history_is_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/u1/analysis_history.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("null"))
        .mount(&server)
        .await;

    let response = TestApp::new(&server)
        .build()
        .oneshot(get("/api/dashboard", Some(GOOD_TOKEN)))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["data"]["dataSource"], "empty");
    assert_eq!(json["data"]["totalAnalyses"], 0);
}

#[tokio::test]
async fn verify_reports_the_token_owner() {
    let server = MockServer::start().await;
    mount_writable_database(&server).await;

    let response = TestApp::new(&server)
        .build()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/verify")
                .header(header::AUTHORIZATION, format!("Bearer {GOOD_TOKEN}"))
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["data"]["valid"], true);
    assert_eq!(json["data"]["user"]["uid"], "u1");
    assert_eq!(json["data"]["user"]["email"], "driver@example.com");
}

#[tokio::test]
async fn create_vehicle_rejects_blank_fields() {
    let server = MockServer::start().await;

    let response = TestApp::new(&server)
        .build()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/vehicles")
                .header(header::AUTHORIZATION, format!("Bearer {GOOD_TOKEN}"))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({ "make": "  ", "model": "Nexon", "year": "2022" }).to_string(),
                ))
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert_eq!(json["error"]["message"], "'make' is required");
}

#[tokio::test]
async fn create_vehicle_stores_and_returns_201() {
    let server = MockServer::start().await;
    mount_writable_database(&server).await;

    let response = TestApp::new(&server)
        .build()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/vehicles")
                .header(header::AUTHORIZATION, format!("Bearer {GOOD_TOKEN}"))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({ "make": "Tata", "model": "Nexon", "year": "2022" }).to_string(),
                ))
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = json_body(response).await;
    assert_eq!(json["data"]["make"], "Tata");
    assert!(json["data"]["id"].as_str().is_some_and(|id| !id.is_empty()));
}

#[tokio::test]
async fn rate_limit_rejects_requests_over_the_window() {
    let server = MockServer::start().await;
    mount_writable_database(&server).await;

    let mut app = TestApp::new(&server);
    app.rate_limit = RateLimitState::new(1, Duration::from_secs(60));
    let app = app.build();

    let first = app
        .clone()
        .oneshot(get("/api/profile", Some(GOOD_TOKEN)))
        .await
        .expect("response");
    assert_eq!(first.status(), StatusCode::OK);

    let second = app
        .oneshot(get("/api/profile", Some(GOOD_TOKEN)))
        .await
        .expect("response");
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[test]
fn pipeline_from_mock_config_reports_mock_provider() {
    let config = test_config("https://example.firebaseio.com", &[]);
    let pipeline = AnalysisPipeline::from_config(&config).expect("pipeline");
    assert_eq!(pipeline.provider_name(), "mock");
}
