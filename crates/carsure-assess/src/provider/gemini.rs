use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine};
use reqwest::{StatusCode, Url};
use serde_json::{json, Value};

use super::{ImageInput, VisionProvider};
use crate::error::ProviderError;
use crate::key_pool::ApiKeyPool;

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

const USER_AGENT: &str = concat!("carsure/", env!("CARGO_PKG_VERSION"));
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Gemini `generateContent` client with key rotation.
///
/// On a quota error the key is benched in the shared [`ApiKeyPool`] and the
/// next key is tried, at most once per key in the pool.
pub struct GeminiProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
    pool: Arc<ApiKeyPool>,
}

impl GeminiProvider {
    /// # Errors
    ///
    /// Returns [`ProviderError::Http`] if the HTTP client cannot be built.
    pub fn new(
        pool: Arc<ApiKeyPool>,
        model: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self, ProviderError> {
        Self::with_base_url(pool, model, timeout_secs, DEFAULT_GEMINI_BASE_URL)
    }

    /// Points the client at a different host; used by tests.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Http`] if the HTTP client cannot be built.
    pub fn with_base_url(
        pool: Arc<ApiKeyPool>,
        model: impl Into<String>,
        timeout_secs: u64,
        base_url: impl Into<String>,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            pool,
        })
    }

    fn build_url(&self) -> Result<Url, ProviderError> {
        Url::parse(&format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        ))
        .map_err(|e| ProviderError::Upstream {
            status: None,
            message: format!("invalid Gemini URL: {e}"),
        })
    }

    async fn call(&self, key: &str, prompt: &str, image: ImageInput<'_>) -> Result<String, ProviderError> {
        let body = json!({
            "contents": [{
                "parts": [
                    { "text": prompt },
                    {
                        "inline_data": {
                            "mime_type": image.mime_type,
                            "data": general_purpose::STANDARD.encode(image.bytes),
                        }
                    }
                ]
            }]
        });

        let response = self
            .client
            .post(self.build_url()?)
            .header(API_KEY_HEADER, key)
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(classify_failure(status, &text));
        }

        let value: Value = serde_json::from_str(&text)
            .map_err(|e| ProviderError::InvalidResponse(format!("response is not JSON: {e}")))?;
        extract_text(&value)
    }
}

#[async_trait]
impl VisionProvider for GeminiProvider {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn generate(&self, prompt: &str, image: ImageInput<'_>) -> Result<String, ProviderError> {
        if self.pool.is_empty() {
            return Err(ProviderError::NotConfigured);
        }

        let mut last_quota_error = None;
        for attempt in 0..self.pool.len() {
            let Some(lease) = self.pool.next_key().await else {
                break;
            };
            tracing::debug!(key_index = lease.index, attempt, model = %self.model, "calling Gemini");

            match self.call(&lease.key, prompt, image).await {
                Ok(text) => {
                    self.pool.mark_success(lease.index).await;
                    return Ok(text);
                }
                Err(ProviderError::QuotaExceeded(message)) => {
                    self.pool.mark_quota_exceeded(lease.index).await;
                    last_quota_error = Some(message);
                }
                Err(e) => return Err(e),
            }
        }

        Err(ProviderError::QuotaExceeded(last_quota_error.unwrap_or_else(
            || "every API key is cooling down".to_string(),
        )))
    }
}

/// Maps a non-success status and body to a typed error.
fn classify_failure(status: StatusCode, body: &str) -> ProviderError {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let upstream_status = parsed
        .as_ref()
        .and_then(|v| v["error"]["status"].as_str())
        .unwrap_or_default();
    let message = parsed
        .as_ref()
        .and_then(|v| v["error"]["message"].as_str())
        .map_or_else(|| truncate(body, 300), str::to_string);

    if status == StatusCode::TOO_MANY_REQUESTS || upstream_status == "RESOURCE_EXHAUSTED" {
        ProviderError::QuotaExceeded(message)
    } else if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        ProviderError::Auth(message)
    } else {
        ProviderError::Upstream {
            status: Some(status.as_u16()),
            message,
        }
    }
}

/// Concatenates the text parts of the first candidate.
fn extract_text(response: &Value) -> Result<String, ProviderError> {
    let text: String = response["candidates"][0]["content"]["parts"]
        .as_array()
        .map(|parts| {
            parts
                .iter()
                .filter_map(|p| p["text"].as_str())
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        let reason = response["promptFeedback"]["blockReason"]
            .as_str()
            .or_else(|| response["candidates"][0]["finishReason"].as_str())
            .unwrap_or("no candidates");
        return Err(ProviderError::InvalidResponse(format!(
            "empty reply from Gemini ({reason})"
        )));
    }
    Ok(text)
}

fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_exhausted_body_is_quota_even_without_429() {
        let body = r#"{"error":{"code":400,"status":"RESOURCE_EXHAUSTED","message":"Quota exceeded"}}"#;
        let err = classify_failure(StatusCode::BAD_REQUEST, body);
        assert!(err.is_quota_exceeded());
    }

    #[test]
    fn forbidden_is_auth() {
        let err = classify_failure(StatusCode::FORBIDDEN, "{}");
        assert!(matches!(err, ProviderError::Auth(_)));
    }

    #[test]
    fn server_error_is_upstream_with_status() {
        let err = classify_failure(StatusCode::INTERNAL_SERVER_ERROR, "boom");
        match err {
            ProviderError::Upstream { status, message } => {
                assert_eq!(status, Some(500));
                assert_eq!(message, "boom");
            }
            other => panic!("expected Upstream, got {other:?}"),
        }
    }

    #[test]
    fn extract_text_joins_parts() {
        let value = json!({
            "candidates": [{ "content": { "parts": [{ "text": "Make: " }, { "text": "Kia" }] } }]
        });
        assert_eq!(extract_text(&value).expect("text"), "Make: Kia");
    }

    #[test]
    fn blocked_prompt_is_invalid_response() {
        let value = json!({ "promptFeedback": { "blockReason": "SAFETY" } });
        let err = extract_text(&value).expect_err("blocked");
        assert!(err.to_string().contains("SAFETY"));
    }
}
