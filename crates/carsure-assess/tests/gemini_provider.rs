//! Integration tests for `GeminiProvider` key rotation using wiremock HTTP mocks.

use std::sync::Arc;

use carsure_assess::{ApiKeyPool, GeminiProvider, ImageInput, ProviderError, VisionProvider};
use wiremock::matchers::{body_partial_json, header, method, path, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

const MODEL: &str = "gemini-1.5-flash";
const GENERATE_PATH: &str = "/v1beta/models/gemini-1.5-flash:generateContent";

fn provider(server: &MockServer, keys: &[&str]) -> (GeminiProvider, Arc<ApiKeyPool>) {
    let pool = Arc::new(ApiKeyPool::new(
        keys.iter().map(|k| (*k).to_string()).collect(),
    ));
    let provider = GeminiProvider::with_base_url(Arc::clone(&pool), MODEL, 5, server.uri())
        .expect("client construction should not fail");
    (provider, pool)
}

fn reply(text: &str) -> serde_json::Value {
    serde_json::json!({
        "candidates": [{ "content": { "parts": [{ "text": text }] } }]
    })
}

fn quota_body() -> serde_json::Value {
    serde_json::json!({
        "error": { "code": 429, "status": "RESOURCE_EXHAUSTED", "message": "Quota exceeded" }
    })
}

#[tokio::test]
async fn sends_inline_image_and_returns_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .and(header("x-goog-api-key", "k1"))
        .and(query_param_is_missing("key"))
        .and(body_partial_json(serde_json::json!({
            "contents": [{ "parts": [
                { "text": "describe" },
                { "inline_data": { "mime_type": "image/png", "data": "iVBORw==" } }
            ]}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(reply("Make: Kia")))
        .expect(1)
        .mount(&server)
        .await;

    let (provider, _) = provider(&server, &["k1"]);
    let image = ImageInput::new(b"\x89PNG");
    let text = provider.generate("describe", image).await.expect("reply");
    assert_eq!(text, "Make: Kia");
}

#[tokio::test]
async fn quota_error_rotates_to_next_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("x-goog-api-key", "k1"))
        .respond_with(ResponseTemplate::new(429).set_body_json(quota_body()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(header("x-goog-api-key", "k2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(reply("ok")))
        .expect(1)
        .mount(&server)
        .await;

    let (provider, pool) = provider(&server, &["k1", "k2"]);
    let text = provider
        .generate("p", ImageInput::new(b"img"))
        .await
        .expect("second key should answer");
    assert_eq!(text, "ok");
    assert_eq!(pool.available().await, 1);
}

#[tokio::test]
async fn all_keys_exhausted_is_quota_exceeded() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_json(quota_body()))
        .expect(2)
        .mount(&server)
        .await;

    let (provider, pool) = provider(&server, &["k1", "k2"]);
    let err = provider
        .generate("p", ImageInput::new(b"img"))
        .await
        .expect_err("should be exhausted");
    assert!(err.is_quota_exceeded());
    assert_eq!(pool.available().await, 0);

    // Both keys are benched, so the next call fails without any request.
    let err = provider
        .generate("p", ImageInput::new(b"img"))
        .await
        .expect_err("still exhausted");
    assert!(err.is_quota_exceeded());
}

#[tokio::test]
async fn auth_failure_does_not_rotate() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
            "error": { "code": 403, "status": "PERMISSION_DENIED", "message": "API key not valid" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (provider, _) = provider(&server, &["bad", "also-bad"]);
    let err = provider
        .generate("p", ImageInput::new(b"img"))
        .await
        .expect_err("should fail");
    match err {
        ProviderError::Auth(message) => assert_eq!(message, "API key not valid"),
        other => panic!("expected Auth, got {other:?}"),
    }
}

#[tokio::test]
async fn server_error_is_upstream() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let (provider, _) = provider(&server, &["k1"]);
    let err = provider
        .generate("p", ImageInput::new(b"img"))
        .await
        .expect_err("should fail");
    assert!(matches!(
        err,
        ProviderError::Upstream {
            status: Some(503),
            ..
        }
    ));
}

#[tokio::test]
async fn empty_pool_is_not_configured() {
    let server = MockServer::start().await;
    let (provider, _) = provider(&server, &[]);
    let err = provider
        .generate("p", ImageInput::new(b"img"))
        .await
        .expect_err("no keys");
    assert!(matches!(err, ProviderError::NotConfigured));
}

#[tokio::test]
async fn transport_error_does_not_expose_api_key() {
    let pool = Arc::new(ApiKeyPool::new(vec!["SECRET-GEMINI-KEY".to_string()]));
    // Nothing listens on port 1, so the connect fails.
    let provider = GeminiProvider::with_base_url(pool, MODEL, 5, "http://127.0.0.1:1")
        .expect("client construction should not fail");

    let err = provider
        .generate("p", ImageInput::new(b"img"))
        .await
        .expect_err("connection should be refused");
    assert!(matches!(err, ProviderError::Http(_)), "got {err:?}");
    assert!(!err.to_string().contains("SECRET-GEMINI-KEY"));
    assert!(!format!("{err:?}").contains("SECRET-GEMINI-KEY"));
}
