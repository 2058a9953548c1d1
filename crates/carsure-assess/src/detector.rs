//! Optional object-detector backend producing damage boxes.
//!
//! The detector is advisory: any failure is logged and treated as "no
//! detections" so the LLM path always completes.

use std::time::Duration;

use async_trait::async_trait;
use carsure_core::{DamageRegion, RegionSource, Severity};
use serde::Deserialize;

const USER_AGENT: &str = concat!("carsure/", env!("CARGO_PKG_VERSION"));

/// Severity thresholds over `area_percent * confidence`.
const SEVERE_SCORE: f64 = 10.0;
const MODERATE_SCORE: f64 = 4.0;

#[async_trait]
pub trait RegionDetector: Send + Sync {
    /// Returns damage regions in percent-of-image units.
    ///
    /// `dims` is the image size in pixels when the caller knows it; it is
    /// used only if the detector response omits its own dimensions.
    async fn detect(&self, image: &[u8], dims: Option<(u32, u32)>) -> Vec<DamageRegion>;
}

/// The default when no detector is configured.
pub struct DisabledDetector;

#[async_trait]
impl RegionDetector for DisabledDetector {
    async fn detect(&self, _image: &[u8], _dims: Option<(u32, u32)>) -> Vec<DamageRegion> {
        Vec::new()
    }
}

#[derive(Debug, Deserialize)]
pub struct DetectorResponse {
    #[serde(default)]
    pub image_width: Option<f64>,
    #[serde(default)]
    pub image_height: Option<f64>,
    #[serde(default)]
    pub boxes: Vec<DetectorBox>,
}

/// Pixel-space box as returned by a YOLO-style inference service.
#[derive(Debug, Deserialize)]
pub struct DetectorBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    pub label: String,
    pub confidence: f64,
}

/// POSTs raw image bytes to an inference endpoint.
pub struct HttpDetector {
    client: reqwest::Client,
    url: String,
}

impl HttpDetector {
    /// # Errors
    ///
    /// Returns [`reqwest::Error`] if the HTTP client cannot be built.
    pub fn new(url: impl Into<String>, timeout_secs: u64) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    async fn fetch(&self, image: &[u8]) -> Result<DetectorResponse, reqwest::Error> {
        self.client
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(image.to_vec())
            .send()
            .await?
            .error_for_status()?
            .json::<DetectorResponse>()
            .await
    }
}

#[async_trait]
impl RegionDetector for HttpDetector {
    async fn detect(&self, image: &[u8], dims: Option<(u32, u32)>) -> Vec<DamageRegion> {
        match self.fetch(image).await {
            Ok(response) => {
                let regions = boxes_to_regions(&response, dims);
                tracing::debug!(count = regions.len(), "detector returned regions");
                regions
            }
            Err(e) => {
                tracing::warn!(error = %e, url = %self.url, "detector request failed; continuing without detections");
                Vec::new()
            }
        }
    }
}

/// Converts pixel boxes to percent regions with ids `cnn_1`, `cnn_2`, ...
///
/// Returns an empty list when the image size is unknown or degenerate.
#[must_use]
pub fn boxes_to_regions(response: &DetectorResponse, dims: Option<(u32, u32)>) -> Vec<DamageRegion> {
    let fallback = dims.map(|(w, h)| (f64::from(w), f64::from(h)));
    let (Some(width), Some(height)) = (
        response.image_width.or(fallback.map(|d| d.0)),
        response.image_height.or(fallback.map(|d| d.1)),
    ) else {
        return Vec::new();
    };
    if width <= 0.0 || height <= 0.0 {
        return Vec::new();
    }

    response
        .boxes
        .iter()
        .enumerate()
        .filter(|(_, b)| b.x2 > b.x1 && b.y2 > b.y1)
        .map(|(i, b)| {
            let x = (b.x1 / width * 100.0).clamp(0.0, 100.0);
            let y = (b.y1 / height * 100.0).clamp(0.0, 100.0);
            let w = ((b.x2 - b.x1) / width * 100.0).clamp(0.0, 100.0 - x);
            let h = ((b.y2 - b.y1) / height * 100.0).clamp(0.0, 100.0 - y);
            DamageRegion {
                id: format!("cnn_{}", i + 1),
                x,
                y,
                width: w,
                height: h,
                damage_type: damage_type_for_label(&b.label).to_string(),
                severity: severity_from_score(w * h / 100.0, b.confidence),
                confidence: b.confidence,
                source: RegionSource::Detector,
            }
        })
        .collect()
}

/// `area_percent` is the share of the whole image the box covers (0–100).
#[must_use]
pub fn severity_from_score(area_percent: f64, confidence: f64) -> Severity {
    let score = area_percent * confidence;
    if score >= SEVERE_SCORE {
        Severity::Severe
    } else if score >= MODERATE_SCORE {
        Severity::Moderate
    } else {
        Severity::Minor
    }
}

#[must_use]
pub fn damage_type_for_label(label: &str) -> &str {
    match label.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
        "dent" | "door_dent" | "bonnet_dent" => "Dent",
        "scratch" | "door_scratch" => "Scratch",
        "crack" => "Crack",
        "glass_shatter" | "glass_broken" | "broken_glass" | "windshield" => "Glass Damage",
        "lamp_broken" | "broken_lamp" | "headlight" | "tail_light" => "Broken Lamp",
        "tire_flat" | "flat_tire" => "Flat Tire",
        "bumper_dent" | "front_bumper_dent" | "rear_bumper_dent" | "bumper" => "Bumper Damage",
        "paint" | "paint_chip" | "paint_damage" => "Paint Damage",
        _ => label,
    }
}
