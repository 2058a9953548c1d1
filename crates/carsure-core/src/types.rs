//! Wire and storage shapes shared by the assessment pipeline, the Firebase
//! repositories, and the HTTP API.
//!
//! Field names follow the JSON the frontend already consumes (camelCase),
//! except where noted.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    None,
    Minor,
    Moderate,
    Severe,
}

impl Severity {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::None => "none",
            Severity::Minor => "minor",
            Severity::Moderate => "moderate",
            Severity::Severe => "severe",
        }
    }

    /// Maps free-text labels ("Severe", "major", "light") to a severity.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "none" | "no damage" => Some(Severity::None),
            "minor" | "light" | "low" | "cosmetic" => Some(Severity::Minor),
            "moderate" | "medium" => Some(Severity::Moderate),
            "severe" | "major" | "high" | "critical" => Some(Severity::Severe),
            _ => None,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which response branch produced a [`StructuredDamageResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisMode {
    Success,
    QuotaFallback,
    NoDamage,
    IdentificationRequired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionSource {
    Llm,
    Detector,
    Synthetic,
}

/// A damaged area, in percent-of-image units (0–100).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DamageRegion {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub damage_type: String,
    pub severity: Severity,
    pub confidence: f64,
    pub source: RegionSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarketSegment {
    Economy,
    #[serde(rename = "Mid-Range")]
    MidRange,
    Premium,
    Luxury,
    #[serde(rename = "Ultra-Luxury")]
    UltraLuxury,
}

impl MarketSegment {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            MarketSegment::Economy => "Economy",
            MarketSegment::MidRange => "Mid-Range",
            MarketSegment::Premium => "Premium",
            MarketSegment::Luxury => "Luxury",
            MarketSegment::UltraLuxury => "Ultra-Luxury",
        }
    }
}

impl std::fmt::Display for MarketSegment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleIdentification {
    pub make: String,
    pub model: String,
    pub year: String,
    pub trim: String,
    pub confidence: f64,
    pub market_segment: MarketSegment,
}

/// One monetary figure rendered for display in both currencies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostAmount {
    /// Indian-grouped rupee string, e.g. `₹1,25,000`.
    pub rupees: String,
    /// Whole-dollar string, e.g. `$1,506`.
    pub dollars: String,
    /// Rupee amount as a number, for aggregation.
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub parts: CostAmount,
    pub labor: CostAmount,
    pub materials: CostAmount,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceTypeCosts {
    pub authorized: CostAmount,
    pub multi_brand: CostAmount,
    pub local: CostAmount,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionalCosts {
    pub metro: CostAmount,
    pub tier1: CostAmount,
    pub tier2: CostAmount,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhancedRepairCost {
    pub conservative: CostAmount,
    pub comprehensive: CostAmount,
    pub breakdown: CostBreakdown,
    pub service_types: ServiceTypeCosts,
    pub regional_variations: RegionalCosts,
    pub market_segment: MarketSegment,
    pub segment_multiplier: f64,
    pub currency: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimRecommendation {
    FileClaim,
    PayOutOfPocket,
    NotApplicable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsuranceRecommendation {
    pub claim_recommendation: ClaimRecommendation,
    pub reasoning: String,
    pub estimated_deductible: CostAmount,
    pub ncb_impact: String,
    pub idv_note: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SafetyStatus {
    Safe,
    Caution,
    Unsafe,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyAssessment {
    pub status: SafetyStatus,
    pub concerns: Vec<String>,
    pub driveable: bool,
}

/// The fixed-shape result returned to the frontend and embedded in every
/// [`AnalysisRecord`]. Nothing here is range-checked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredDamageResult {
    pub damage_type: String,
    pub confidence: f64,
    pub severity: Severity,
    pub description: String,
    pub identified_damage_regions: Vec<DamageRegion>,
    pub vehicle_identification: VehicleIdentification,
    pub enhanced_repair_cost: EnhancedRepairCost,
    pub insurance_recommendation: InsuranceRecommendation,
    pub safety_assessment: SafetyAssessment,
    pub recommendations: Vec<String>,
    pub analysis_mode: AnalysisMode,
    // Snake case on the wire; the frontend checks `demo_mode` literally.
    #[serde(rename = "demo_mode")]
    pub demo_mode: bool,
}

/// Stored at `users/{uid}/analysis_history/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRecord {
    pub id: String,
    pub user_id: String,
    pub uploaded_at: String,
    pub filename: String,
    pub image_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_data: Option<String>,
    pub structured_data: StructuredDamageResult,
    pub raw_analysis: String,
    #[serde(default)]
    pub demo_mode: bool,
}

/// Stored at `users/{uid}/profile`. Counters are best-effort.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub uid: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    pub created_at: String,
    #[serde(default)]
    pub total_analyses: u64,
    #[serde(default)]
    pub total_vehicles: u64,
}

/// Stored at `users/{uid}/vehicles/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    pub id: String,
    pub make: String,
    pub model: String,
    pub year: String,
    #[serde(default)]
    pub registration_number: Option<String>,
    pub added_at: String,
}
