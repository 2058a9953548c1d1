//! Firebase ID-token verification.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::VerifyError;

pub const DEFAULT_IDENTITY_TOOLKIT_URL: &str = "https://identitytoolkit.googleapis.com";

/// The caller identity behind a verified token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedUser {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub email_verified: bool,
}

#[async_trait]
pub trait TokenVerifier: Send + Sync {
    /// # Errors
    ///
    /// Returns [`VerifyError::InvalidToken`] for a token the identity
    /// service rejects, other variants when the service cannot be reached.
    async fn verify(&self, id_token: &str) -> Result<VerifiedUser, VerifyError>;
}

/// Verifies tokens with the Identity Toolkit `accounts:lookup` endpoint.
///
/// The lookup only succeeds for a valid, unexpired token issued for the
/// project that owns `api_key`.
pub struct IdentityToolkitVerifier {
    client: Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    email_verified: bool,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

impl IdentityToolkitVerifier {
    /// # Errors
    ///
    /// Returns [`VerifyError::Http`] if the HTTP client cannot be built.
    pub fn new(api_key: &str, timeout_secs: u64) -> Result<Self, VerifyError> {
        Self::with_base_url(api_key, timeout_secs, DEFAULT_IDENTITY_TOOLKIT_URL)
    }

    /// # Errors
    ///
    /// Returns [`VerifyError::Http`] if the HTTP client cannot be built.
    pub fn with_base_url(
        api_key: &str,
        timeout_secs: u64,
        base_url: &str,
    ) -> Result<Self, VerifyError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_owned(),
        })
    }

    fn lookup_url(&self) -> Result<Url, VerifyError> {
        let mut url = Url::parse(&format!("{}/v1/accounts:lookup", self.base_url)).map_err(|e| {
            VerifyError::Upstream {
                status: 0,
                message: format!("invalid identity service URL: {e}"),
            }
        })?;
        url.query_pairs_mut().append_pair("key", &self.api_key);
        Ok(url)
    }
}

#[async_trait]
impl TokenVerifier for IdentityToolkitVerifier {
    async fn verify(&self, id_token: &str) -> Result<VerifiedUser, VerifyError> {
        let response = self
            .client
            .post(self.lookup_url()?)
            .json(&json!({ "idToken": id_token }))
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;

        if status == StatusCode::BAD_REQUEST {
            let reason = serde_json::from_str::<Value>(&text)
                .ok()
                .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
                .unwrap_or_else(|| "rejected".to_string());
            return Err(VerifyError::InvalidToken(reason));
        }
        if !status.is_success() {
            return Err(VerifyError::Upstream {
                status: status.as_u16(),
                message: text.chars().take(300).collect(),
            });
        }

        let parsed: LookupResponse = serde_json::from_str(&text).map_err(|e| VerifyError::Upstream {
            status: status.as_u16(),
            message: format!("unexpected lookup response: {e}"),
        })?;
        let user = parsed
            .users
            .into_iter()
            .next()
            .ok_or_else(|| VerifyError::InvalidToken("no user for token".to_string()))?;

        Ok(VerifiedUser {
            uid: user.local_id,
            email: user.email,
            display_name: user.display_name,
            email_verified: user.email_verified,
        })
    }
}

/// Fixed token table. With no entries it rejects every token, which is the
/// verifier used when no Firebase API key is configured.
#[derive(Debug, Clone, Default)]
pub struct StaticTokenVerifier {
    tokens: HashMap<String, VerifiedUser>,
}

impl StaticTokenVerifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>, user: VerifiedUser) -> Self {
        self.tokens.insert(token.into(), user);
        self
    }
}

#[async_trait]
impl TokenVerifier for StaticTokenVerifier {
    async fn verify(&self, id_token: &str) -> Result<VerifiedUser, VerifyError> {
        self.tokens
            .get(id_token)
            .cloned()
            .ok_or_else(|| VerifyError::InvalidToken("unknown token".to_string()))
    }
}
