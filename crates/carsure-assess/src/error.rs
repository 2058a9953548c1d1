use thiserror::Error;

/// Errors raised by a [`crate::VisionProvider`].
///
/// Callers branch on the variant, never on the message text.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The upstream reported rate limiting or an exhausted quota on every
    /// key that was tried.
    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),

    /// The upstream rejected the credentials.
    #[error("authentication rejected by provider: {0}")]
    Auth(String),

    /// Any other non-success answer from the upstream.
    #[error("upstream error (status {status:?}): {message}")]
    Upstream {
        status: Option<u16>,
        message: String,
    },

    /// Network or TLS failure from the underlying HTTP client, with the
    /// request URL stripped.
    #[error("HTTP error: {0}")]
    Http(#[source] reqwest::Error),

    /// A success response that did not contain any text.
    #[error("invalid provider response: {0}")]
    InvalidResponse(String),

    #[error("no API keys configured")]
    NotConfigured,
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        ProviderError::Http(e.without_url())
    }
}

impl ProviderError {
    #[must_use]
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, ProviderError::QuotaExceeded(_))
    }
}

#[derive(Debug, Error)]
pub enum AssessError {
    #[error("image upload is empty")]
    EmptyImage,

    #[error(transparent)]
    Provider(#[from] ProviderError),
}
