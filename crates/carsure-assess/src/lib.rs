//! Vehicle damage assessment: LLM reply parsing, cost normalization, detector
//! region merging, and the end-to-end analysis pipeline.
//!
//! The vision model answers in loosely structured prose. [`extract`] pulls
//! fields out of it with ordered regex alternatives, [`cost`] turns whatever
//! cost figures survived into a fixed breakdown, [`merge`] folds detector
//! boxes into the model's own regions, and [`builder`] assembles the final
//! [`carsure_core::StructuredDamageResult`] for every response mode.

pub mod builder;
pub mod classify;
pub mod cost;
pub mod detector;
pub mod error;
pub mod extract;
pub mod key_pool;
pub mod merge;
pub mod pipeline;
pub mod prompts;
pub mod provider;

pub use builder::{
    build_no_damage_result, build_quota_fallback_result, build_unassessed_result,
    parse_ai_response_to_damage_result,
};
pub use detector::{DisabledDetector, HttpDetector, RegionDetector};
pub use error::{AssessError, ProviderError};
pub use key_pool::ApiKeyPool;
pub use pipeline::{image_dimensions, image_fingerprint, AnalysisOutcome, AnalysisPipeline};
pub use provider::{GeminiProvider, ImageInput, MockProvider, VisionProvider};
