//! Minimal Firebase Realtime Database REST client.
//!
//! Every node is addressed as `{database_url}/{path}.json`. Reads are GET,
//! `set` is PUT, `update` is PATCH, and `push` is POST (the server picks the
//! child key). Each call takes the caller's ID token, sent as `?auth=`, so
//! database security rules apply per user.

use std::time::Duration;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::{Client, Method, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::FirebaseError;

/// Path segments keep `-` and `_` (push ids use both); everything else that
/// is not alphanumeric is escaped.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_');

#[derive(Deserialize)]
struct PushReply {
    name: String,
}

/// Query options for a read.
#[derive(Debug, Clone, Default)]
pub struct Query {
    /// Child key to order by; sent JSON-quoted as Firebase expects.
    pub order_by: Option<String>,
    /// Only meaningful together with `order_by`.
    pub limit_to_last: Option<usize>,
    /// Return only the keys of the node's children.
    pub shallow: bool,
    /// Overrides the client-wide request timeout.
    pub timeout: Option<Duration>,
}

pub struct FirebaseClient {
    client: Client,
    base_url: String,
    list_timeout: Duration,
}

impl FirebaseClient {
    /// # Errors
    ///
    /// Returns [`FirebaseError::InvalidUrl`] if `database_url` does not parse,
    /// or [`FirebaseError::Http`] if the HTTP client cannot be built.
    pub fn new(
        database_url: &str,
        timeout_secs: u64,
        list_timeout_secs: u64,
    ) -> Result<Self, FirebaseError> {
        let trimmed = database_url.trim_end_matches('/');
        Url::parse(trimmed).map_err(|e| FirebaseError::InvalidUrl {
            url: database_url.to_string(),
            reason: e.to_string(),
        })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!("carsure/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: trimmed.to_string(),
            list_timeout: Duration::from_secs(list_timeout_secs),
        })
    }

    /// Timeout applied to list and history reads.
    #[must_use]
    pub fn list_timeout(&self) -> Duration {
        self.list_timeout
    }

    /// Reference to the node at `path` (slash-separated, no leading slash
    /// required).
    #[must_use]
    pub fn child(&self, path: &str) -> DbRef<'_> {
        DbRef {
            client: self,
            segments: split_path(path),
        }
    }

    fn node_url(&self, segments: &[String]) -> Result<Url, FirebaseError> {
        let encoded: Vec<String> = segments
            .iter()
            .map(|s| utf8_percent_encode(s, SEGMENT).to_string())
            .collect();
        let raw = format!("{}/{}.json", self.base_url, encoded.join("/"));
        Url::parse(&raw).map_err(|e| FirebaseError::InvalidUrl {
            url: raw,
            reason: e.to_string(),
        })
    }
}

fn split_path(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// A database location. Cheap to create; holds no connection state.
pub struct DbRef<'a> {
    client: &'a FirebaseClient,
    segments: Vec<String>,
}

impl DbRef<'_> {
    #[must_use]
    pub fn child(&self, path: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.extend(split_path(path));
        Self {
            client: self.client,
            segments,
        }
    }

    #[must_use]
    pub fn path(&self) -> String {
        self.segments.join("/")
    }

    /// Reads the node. A missing node is `Value::Null`, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`FirebaseError`] on transport failure or a non-2xx status.
    pub async fn get(&self, auth: Option<&str>) -> Result<Value, FirebaseError> {
        self.get_with(&Query::default(), auth).await
    }

    /// # Errors
    ///
    /// Returns [`FirebaseError`] on transport failure or a non-2xx status;
    /// an unindexed `order_by` surfaces as a 400 [`FirebaseError::Status`].
    pub async fn get_with(&self, query: &Query, auth: Option<&str>) -> Result<Value, FirebaseError> {
        let mut params: Vec<(&str, String)> = Vec::new();
        if let Some(key) = &query.order_by {
            params.push(("orderBy", format!("\"{key}\"")));
            if let Some(limit) = query.limit_to_last {
                params.push(("limitToLast", limit.to_string()));
            }
        }
        if query.shallow {
            params.push(("shallow", "true".to_string()));
        }

        let mut url = self.client.node_url(&self.segments)?;
        if !params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in &params {
                pairs.append_pair(k, v);
            }
        }
        self.send(Method::GET, url, None, query.timeout, auth).await
    }

    /// Replaces the node (PUT).
    ///
    /// # Errors
    ///
    /// Returns [`FirebaseError`] on serialization, transport, or status failure.
    pub async fn set<T: Serialize + ?Sized>(
        &self,
        value: &T,
        auth: Option<&str>,
    ) -> Result<Value, FirebaseError> {
        let body = self.to_body(value)?;
        let url = self.client.node_url(&self.segments)?;
        self.send(Method::PUT, url, Some(body), None, auth).await
    }

    /// Merges the given children into the node (PATCH).
    ///
    /// # Errors
    ///
    /// Returns [`FirebaseError`] on serialization, transport, or status failure.
    pub async fn update<T: Serialize + ?Sized>(
        &self,
        value: &T,
        auth: Option<&str>,
    ) -> Result<Value, FirebaseError> {
        let body = self.to_body(value)?;
        let url = self.client.node_url(&self.segments)?;
        self.send(Method::PATCH, url, Some(body), None, auth).await
    }

    /// Appends a child with a server-generated key (POST) and returns the key.
    ///
    /// # Errors
    ///
    /// Returns [`FirebaseError`] on serialization, transport, or status
    /// failure, or [`FirebaseError::Deserialize`] if the reply has no `name`.
    pub async fn push<T: Serialize + ?Sized>(
        &self,
        value: &T,
        auth: Option<&str>,
    ) -> Result<String, FirebaseError> {
        let body = self.to_body(value)?;
        let url = self.client.node_url(&self.segments)?;
        let reply = self.send(Method::POST, url, Some(body), None, auth).await?;
        serde_json::from_value::<PushReply>(reply)
            .map(|r| r.name)
            .map_err(|e| FirebaseError::Deserialize {
                context: format!("push({})", self.path()),
                source: e,
            })
    }

    fn to_body<T: Serialize + ?Sized>(&self, value: &T) -> Result<Value, FirebaseError> {
        serde_json::to_value(value).map_err(|e| FirebaseError::Deserialize {
            context: format!("serialize body for {}", self.path()),
            source: e,
        })
    }

    async fn send(
        &self,
        method: Method,
        mut url: Url,
        body: Option<Value>,
        timeout: Option<Duration>,
        auth: Option<&str>,
    ) -> Result<Value, FirebaseError> {
        if let Some(token) = auth {
            url.query_pairs_mut().append_pair("auth", token);
        }

        let mut request = self.client.client.request(method.clone(), url);
        if let Some(body) = &body {
            request = request.json(body);
        }
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<Value>(&text)
                .ok()
                .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string))
                .unwrap_or_else(|| text.chars().take(300).collect());
            tracing::debug!(%method, path = %self.path(), status = status.as_u16(), %message, "firebase request failed");
            return Err(FirebaseError::Status {
                status: status.as_u16(),
                path: self.path(),
                message,
            });
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| FirebaseError::Deserialize {
            context: format!("{method} {}", self.path()),
            source: e,
        })
    }
}
