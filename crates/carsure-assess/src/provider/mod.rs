//! Multimodal LLM backends.

mod gemini;
mod mock;

use async_trait::async_trait;

pub use gemini::{GeminiProvider, DEFAULT_GEMINI_BASE_URL};
pub use mock::MockProvider;

use crate::error::ProviderError;

/// An uploaded image as sent to a provider.
#[derive(Debug, Clone, Copy)]
pub struct ImageInput<'a> {
    pub bytes: &'a [u8],
    pub mime_type: &'a str,
}

impl<'a> ImageInput<'a> {
    #[must_use]
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            mime_type: sniff_mime_type(bytes),
        }
    }
}

#[async_trait]
pub trait VisionProvider: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Sends `prompt` with `image` and returns the model's text reply.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::QuotaExceeded`] when every usable key is out
    /// of quota; other variants for auth, transport, or malformed replies.
    async fn generate(&self, prompt: &str, image: ImageInput<'_>) -> Result<String, ProviderError>;
}

/// MIME type from magic bytes; JPEG when unrecognized.
#[must_use]
pub fn sniff_mime_type(bytes: &[u8]) -> &'static str {
    match bytes {
        [0x89, b'P', b'N', b'G', ..] => "image/png",
        [0xFF, 0xD8, ..] => "image/jpeg",
        [b'G', b'I', b'F', b'8', ..] => "image/gif",
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => "image/webp",
        _ => "image/jpeg",
    }
}
