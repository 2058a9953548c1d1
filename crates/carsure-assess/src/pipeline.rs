use std::io::Cursor;
use std::sync::Arc;

use carsure_core::{AiProvider, AppConfig, StructuredDamageResult};
use sha2::{Digest, Sha256};

use crate::builder::{build_quota_fallback_result, parse_ai_response_to_damage_result};
use crate::detector::{DisabledDetector, HttpDetector, RegionDetector};
use crate::error::{AssessError, ProviderError};
use crate::key_pool::ApiKeyPool;
use crate::prompts::DAMAGE_ANALYSIS_PROMPT;
use crate::provider::{GeminiProvider, ImageInput, MockProvider, VisionProvider};

const DETECTOR_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    /// The model's reply verbatim; empty in quota fallback.
    pub raw_analysis: String,
    pub structured: StructuredDamageResult,
}

/// Provider + detector + parser, wired once at startup and shared.
#[derive(Clone)]
pub struct AnalysisPipeline {
    provider: Arc<dyn VisionProvider>,
    detector: Arc<dyn RegionDetector>,
}

impl AnalysisPipeline {
    #[must_use]
    pub fn new(provider: Arc<dyn VisionProvider>, detector: Arc<dyn RegionDetector>) -> Self {
        Self { provider, detector }
    }

    /// Wires the configured provider and detector.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Http`] if an HTTP client cannot be built.
    pub fn from_config(config: &AppConfig) -> Result<Self, ProviderError> {
        let provider: Arc<dyn VisionProvider> = match config.ai_provider {
            AiProvider::Mock => Arc::new(MockProvider::new()),
            AiProvider::Gemini => {
                let pool = Arc::new(ApiKeyPool::new(config.gemini_api_keys.clone()));
                Arc::new(GeminiProvider::new(
                    pool,
                    config.gemini_model.clone(),
                    config.gemini_timeout_secs,
                )?)
            }
        };

        let detector: Arc<dyn RegionDetector> = match config.detector_url.as_deref() {
            Some(url) if config.detector_enabled => {
                Arc::new(HttpDetector::new(url, DETECTOR_TIMEOUT_SECS)?)
            }
            _ => Arc::new(DisabledDetector),
        };

        tracing::info!(
            provider = provider.name(),
            keys = config.gemini_api_keys.len(),
            detector_enabled = config.detector_enabled,
            "analysis pipeline configured"
        );
        Ok(Self::new(provider, detector))
    }

    #[must_use]
    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    /// Runs the provider and the detector concurrently, then builds the
    /// structured result.
    ///
    /// # Errors
    ///
    /// Returns [`AssessError::EmptyImage`] for an empty upload, or
    /// [`AssessError::Provider`] for any provider failure other than an
    /// exhausted quota, which yields a demo result instead.
    pub async fn analyze(&self, image: &[u8], filename: &str) -> Result<AnalysisOutcome, AssessError> {
        if image.is_empty() {
            return Err(AssessError::EmptyImage);
        }
        let input = ImageInput::new(image);
        tracing::info!(
            filename,
            bytes = image.len(),
            mime_type = input.mime_type,
            provider = self.provider.name(),
            "analyzing image"
        );

        let dims = image_dimensions(image);
        if dims.is_none() {
            tracing::debug!(filename, "image size not readable from header");
        }
        let (reply, detected) = tokio::join!(
            self.provider.generate(DAMAGE_ANALYSIS_PROMPT, input),
            self.detector.detect(image, dims),
        );

        match reply {
            Ok(text) => {
                let structured = parse_ai_response_to_damage_result(&text, detected);
                tracing::info!(
                    filename,
                    mode = ?structured.analysis_mode,
                    damage_type = %structured.damage_type,
                    regions = structured.identified_damage_regions.len(),
                    "analysis complete"
                );
                Ok(AnalysisOutcome {
                    raw_analysis: text,
                    structured,
                })
            }
            Err(e) if e.is_quota_exceeded() => {
                tracing::warn!(filename, reason = %e, "provider quota exhausted; returning demo result");
                let structured = build_quota_fallback_result(&mut rand::rng(), detected);
                Ok(AnalysisOutcome {
                    raw_analysis: String::new(),
                    structured,
                })
            }
            Err(e) => {
                tracing::error!(filename, error = %e, "provider call failed");
                Err(e.into())
            }
        }
    }
}

/// Pixel `(width, height)` read from the image header, without decoding.
#[must_use]
pub fn image_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .ok()?
        .into_dimensions()
        .ok()
}

/// Lowercase hex SHA-256 of the upload.
#[must_use]
pub fn image_fingerprint(bytes: &[u8]) -> String {
    use std::fmt::Write as _;

    Sha256::digest(bytes)
        .iter()
        .fold(String::with_capacity(64), |mut out, b| {
            let _ = write!(out, "{b:02x}");
            out
        })
}
