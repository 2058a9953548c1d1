use thiserror::Error;

/// Errors returned by the Realtime Database REST client.
#[derive(Debug, Error)]
pub enum FirebaseError {
    /// Network, TLS, or timeout failure from the underlying HTTP client.
    /// The request URL is stripped: it carries the `?auth=` token.
    #[error("HTTP error: {0}")]
    Http(#[source] reqwest::Error),

    /// The database answered with a non-2xx status.
    #[error("Firebase returned {status} for {path}: {message}")]
    Status {
        status: u16,
        path: String,
        message: String,
    },

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid database URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}

impl From<reqwest::Error> for FirebaseError {
    fn from(e: reqwest::Error) -> Self {
        FirebaseError::Http(e.without_url())
    }
}

impl FirebaseError {
    /// True when the server rejected the query itself, e.g. an `orderBy` on
    /// a child with no index.
    #[must_use]
    pub fn is_bad_request(&self) -> bool {
        matches!(self, FirebaseError::Status { status: 400, .. })
    }
}

/// Errors from ID-token verification.
#[derive(Debug, Error)]
pub enum VerifyError {
    /// The token is malformed, expired, or revoked.
    #[error("invalid ID token: {0}")]
    InvalidToken(String),

    #[error("HTTP error: {0}")]
    Http(#[source] reqwest::Error),

    #[error("identity service error (status {status}): {message}")]
    Upstream { status: u16, message: String },
}

// The lookup URL carries the API key.
impl From<reqwest::Error> for VerifyError {
    fn from(e: reqwest::Error) -> Self {
        VerifyError::Http(e.without_url())
    }
}
