//! Assembly of [`StructuredDamageResult`] for every response mode.
//!
//! Each mode fills a [`ResultTemplate`]; the template alone derives costs,
//! insurance advice, safety, and recommendations, so the modes cannot drift
//! apart in shape.

use carsure_core::money::cost_amount;
use carsure_core::{
    AnalysisMode, ClaimRecommendation, DamageRegion, InsuranceRecommendation, MarketSegment,
    RegionSource, SafetyAssessment, SafetyStatus, Severity, StructuredDamageResult,
    VehicleIdentification,
};
use rand::Rng;

use crate::classify::classify_response;
use crate::cost::{
    estimate_repair_cost, fallback_base_cost, rupees_from_text, segment_for_make,
    zero_repair_cost, COMPREHENSIVE_FACTOR,
};
use crate::extract::{
    determine_damage_type_and_confidence, extract_description, extract_llm_regions,
    extract_repair_costs, extract_vehicle_fields, find_repair_costs, stated_severity,
    VehicleFields, UNKNOWN,
};
use crate::merge::merge_regions;

/// Below this conservative estimate, paying directly usually beats losing
/// the No-Claim Bonus.
pub const CLAIM_THRESHOLD_INR: f64 = 15_000.0;

const DEMO_DAMAGE_TYPES: &[&str] = &["Dent", "Scratch", "Bumper Damage", "Crack", "Paint Damage"];

#[derive(Debug, Clone)]
pub struct ResultTemplate {
    pub mode: AnalysisMode,
    pub damage_type: String,
    pub confidence: f64,
    pub severity: Severity,
    pub description: String,
    pub regions: Vec<DamageRegion>,
    pub vehicle: VehicleFields,
    pub conservative_inr: f64,
    pub comprehensive_inr: f64,
    pub demo_mode: bool,
}

impl ResultTemplate {
    /// A success whose reply named no damage type.
    fn is_unassessed(&self) -> bool {
        self.mode == AnalysisMode::Success && self.damage_type == UNKNOWN
    }

    /// No-damage, identification-required and unassessed results always
    /// carry zero cost and no regions, whatever the template was filled with.
    #[must_use]
    pub fn build(self) -> StructuredDamageResult {
        let unassessed = self.is_unassessed();
        let zero_cost = unassessed
            || matches!(
                self.mode,
                AnalysisMode::NoDamage | AnalysisMode::IdentificationRequired
            );
        let segment = segment_for_make(&self.vehicle.make);

        let (severity, regions, conservative, enhanced_repair_cost) = if zero_cost {
            (Severity::None, Vec::new(), 0.0, zero_repair_cost(segment))
        } else {
            (
                self.severity,
                self.regions,
                self.conservative_inr,
                estimate_repair_cost(self.conservative_inr, self.comprehensive_inr, segment),
            )
        };

        StructuredDamageResult {
            insurance_recommendation: insurance_recommendation(
                self.mode,
                unassessed,
                severity,
                conservative,
                segment,
            ),
            safety_assessment: safety_assessment(self.mode, unassessed, severity, &self.damage_type),
            recommendations: recommendations(self.mode, unassessed, severity),
            damage_type: self.damage_type,
            confidence: self.confidence,
            severity,
            description: self.description,
            identified_damage_regions: regions,
            vehicle_identification: VehicleIdentification {
                make: self.vehicle.make,
                model: self.vehicle.model,
                year: self.vehicle.year,
                trim: self.vehicle.trim,
                confidence: self.vehicle.confidence,
                market_segment: segment,
            },
            enhanced_repair_cost,
            analysis_mode: self.mode,
            demo_mode: self.demo_mode,
        }
    }
}

/// Turns a successful model reply plus any detector regions into a result.
#[must_use]
pub fn parse_ai_response_to_damage_result(
    text: &str,
    detector_regions: Vec<DamageRegion>,
) -> StructuredDamageResult {
    let vehicle = extract_vehicle_fields(text);
    let damage = determine_damage_type_and_confidence(text);

    match classify_response(text, &damage) {
        AnalysisMode::NoDamage => build_no_damage_result(vehicle, damage.confidence),
        AnalysisMode::IdentificationRequired => ResultTemplate {
            mode: AnalysisMode::IdentificationRequired,
            damage_type: damage.damage_type,
            confidence: damage.confidence,
            severity: Severity::None,
            description: "The vehicle could not be identified with enough confidence. \
                          Upload a clearer photo showing the make badge or rear of the car."
                .to_string(),
            regions: Vec::new(),
            vehicle,
            conservative_inr: 0.0,
            comprehensive_inr: 0.0,
            demo_mode: false,
        }
        .build(),
        AnalysisMode::Success | AnalysisMode::QuotaFallback if damage.damage_type == UNKNOWN => {
            build_unassessed_result(vehicle, damage.confidence)
        }
        AnalysisMode::Success | AnalysisMode::QuotaFallback => {
            let segment = segment_for_make(&vehicle.make);
            // Stated costs win, then the stated severity's base cost, then the
            // fixed extractor defaults.
            let (conservative_inr, comprehensive_inr) =
                if find_repair_costs(text).is_none() && stated_severity(text).is_some() {
                    let base = fallback_base_cost(damage.severity, segment);
                    (base, base * COMPREHENSIVE_FACTOR)
                } else {
                    let costs = extract_repair_costs(text);
                    let conservative = rupees_from_text(&costs.conservative).unwrap_or(0.0);
                    let comprehensive =
                        rupees_from_text(&costs.comprehensive).unwrap_or(conservative);
                    (conservative, comprehensive)
                };
            let llm_regions = extract_llm_regions(text, damage.confidence);

            ResultTemplate {
                mode: AnalysisMode::Success,
                description: extract_description(text),
                damage_type: damage.damage_type,
                confidence: damage.confidence,
                severity: damage.severity,
                regions: merge_regions(llm_regions, detector_regions),
                vehicle,
                conservative_inr,
                comprehensive_inr,
                demo_mode: false,
            }
            .build()
        }
    }
}

#[must_use]
pub fn build_no_damage_result(vehicle: VehicleFields, confidence: f64) -> StructuredDamageResult {
    ResultTemplate {
        mode: AnalysisMode::NoDamage,
        damage_type: "No Damage".to_string(),
        confidence,
        severity: Severity::None,
        description: "No visible damage detected. The vehicle appears to be in good condition."
            .to_string(),
        regions: Vec::new(),
        vehicle,
        conservative_inr: 0.0,
        comprehensive_inr: 0.0,
        demo_mode: false,
    }
    .build()
}

/// Zeroed result for a reply that names no damage type: nothing is
/// estimated and no claim is advised.
#[must_use]
pub fn build_unassessed_result(vehicle: VehicleFields, confidence: f64) -> StructuredDamageResult {
    ResultTemplate {
        mode: AnalysisMode::Success,
        damage_type: UNKNOWN.to_string(),
        confidence,
        severity: Severity::None,
        description: "The damage could not be assessed from the AI response.".to_string(),
        regions: Vec::new(),
        vehicle,
        conservative_inr: 0.0,
        comprehensive_inr: 0.0,
        demo_mode: false,
    }
    .build()
}

/// Synthesizes a demo result when every provider key is out of quota.
///
/// Values are random but consistent: every synthetic region shares the
/// overall damage type and severity, and the cost is the severity's base
/// cost jittered by ±15%. Detector regions, if any, are merged in after the
/// synthetic ones.
pub fn build_quota_fallback_result<R: Rng>(
    rng: &mut R,
    detector_regions: Vec<DamageRegion>,
) -> StructuredDamageResult {
    let severity = match rng.random_range(0..3) {
        0 => Severity::Minor,
        1 => Severity::Moderate,
        _ => Severity::Severe,
    };
    let damage_type = DEMO_DAMAGE_TYPES[rng.random_range(0..DEMO_DAMAGE_TYPES.len())];
    let confidence = round2(rng.random_range(0.6..0.85));

    let region_count = rng.random_range(1..=3);
    let synthetic: Vec<DamageRegion> = (1..=region_count)
        .map(|i| DamageRegion {
            id: format!("region_{i}"),
            x: round2(rng.random_range(5.0..60.0)),
            y: round2(rng.random_range(10.0..60.0)),
            width: round2(rng.random_range(10.0..30.0)),
            height: round2(rng.random_range(8.0..25.0)),
            damage_type: damage_type.to_string(),
            severity,
            confidence: round2(rng.random_range(0.6..0.9)),
            source: RegionSource::Synthetic,
        })
        .collect();

    let vehicle = VehicleFields::unknown();
    let base = fallback_base_cost(severity, MarketSegment::MidRange);
    let conservative = (base * rng.random_range(0.85..1.15)).round();
    let kind = damage_type.to_lowercase();

    ResultTemplate {
        mode: AnalysisMode::QuotaFallback,
        damage_type: damage_type.to_string(),
        confidence,
        severity,
        description: format!(
            "Demo assessment: the AI service quota is exhausted, so this {severity} {kind} \
             estimate is illustrative. Retry later for a full analysis."
        ),
        regions: merge_regions(synthetic, detector_regions),
        vehicle,
        conservative_inr: conservative,
        comprehensive_inr: (conservative * COMPREHENSIVE_FACTOR).round(),
        demo_mode: true,
    }
    .build()
}

fn insurance_recommendation(
    mode: AnalysisMode,
    unassessed: bool,
    severity: Severity,
    conservative_inr: f64,
    segment: MarketSegment,
) -> InsuranceRecommendation {
    let deductible = match segment {
        MarketSegment::Economy | MarketSegment::MidRange => 1_000.0,
        _ => 2_000.0,
    };
    let idv_note = if severity == Severity::Severe {
        "Severe damage: compare the estimate with the Insured Declared Value (IDV). \
         Repairs above 75% of IDV may be settled as a total loss."
    } else {
        "Claims are capped at the Insured Declared Value (IDV) on the policy."
    };

    let (claim_recommendation, reasoning, ncb_impact) = if conservative_inr <= 0.0 {
        let reasoning = if mode == AnalysisMode::IdentificationRequired {
            "Identify the vehicle first; a claim estimate needs the make and model."
        } else if unassessed {
            "No damage estimate is available, so no claim advice can be given."
        } else {
            "No repair is needed, so there is nothing to claim."
        };
        (
            ClaimRecommendation::NotApplicable,
            reasoning.to_string(),
            "None.",
        )
    } else if conservative_inr < CLAIM_THRESHOLD_INR {
        (
            ClaimRecommendation::PayOutOfPocket,
            format!(
                "The estimated repair of {} is small enough that a claim would cost more \
                 in lost No-Claim Bonus than it pays out.",
                cost_amount(conservative_inr).rupees
            ),
            "Paying directly keeps the No-Claim Bonus intact.",
        )
    } else {
        (
            ClaimRecommendation::FileClaim,
            format!(
                "The estimated repair of {} is well above the deductible; filing a claim \
                 is worthwhile.",
                cost_amount(conservative_inr).rupees
            ),
            "A claim resets the No-Claim Bonus (up to 50% premium discount) at renewal.",
        )
    };

    InsuranceRecommendation {
        claim_recommendation,
        reasoning,
        estimated_deductible: cost_amount(deductible),
        ncb_impact: ncb_impact.to_string(),
        idv_note: idv_note.to_string(),
    }
}

fn safety_assessment(
    mode: AnalysisMode,
    unassessed: bool,
    severity: Severity,
    damage_type: &str,
) -> SafetyAssessment {
    if unassessed || mode == AnalysisMode::IdentificationRequired {
        return SafetyAssessment {
            status: SafetyStatus::Caution,
            concerns: vec!["Damage could not be assessed from this photo.".to_string()],
            driveable: true,
        };
    }

    let lower = damage_type.to_lowercase();
    let mut concerns = Vec::new();
    if ["glass", "windshield", "windscreen"].iter().any(|k| lower.contains(k)) {
        concerns.push("Cracked or shattered glass reduces visibility.".to_string());
    }
    if ["lamp", "light"].iter().any(|k| lower.contains(k)) {
        concerns.push("Damaged lights make the car harder for others to see.".to_string());
    }
    if ["tire", "tyre", "wheel"].iter().any(|k| lower.contains(k)) {
        concerns.push("Tyre or wheel damage affects handling and braking.".to_string());
    }
    if lower.contains("bumper") && severity != Severity::Minor {
        concerns.push("Bumper impacts can hide sensor or mount damage.".to_string());
    }

    let (status, driveable) = match severity {
        Severity::None => (SafetyStatus::Safe, true),
        Severity::Minor if concerns.is_empty() => (SafetyStatus::Safe, true),
        Severity::Minor | Severity::Moderate => (SafetyStatus::Caution, true),
        Severity::Severe => {
            concerns.push(
                "Possible structural damage; have the frame inspected before driving.".to_string(),
            );
            (SafetyStatus::Unsafe, false)
        }
    };

    SafetyAssessment {
        status,
        concerns,
        driveable,
    }
}

fn recommendations(mode: AnalysisMode, unassessed: bool, severity: Severity) -> Vec<String> {
    if unassessed {
        return vec![
            "Upload a clear, well-lit photo of the damaged area and try again.".to_string(),
            "Have a workshop inspect the vehicle for an exact estimate.".to_string(),
        ];
    }
    let mut out: Vec<&str> = match mode {
        AnalysisMode::NoDamage => vec![
            "No repair needed.",
            "Keep these photos on file as a record of the car's condition.",
        ],
        AnalysisMode::IdentificationRequired => vec![
            "Upload a clear photo showing the make badge or rear of the vehicle.",
            "Include the registration plate if possible.",
        ],
        AnalysisMode::Success | AnalysisMode::QuotaFallback => match severity {
            Severity::None | Severity::Minor => vec![
                "Get quotes from a multi-brand or local workshop.",
                "Paintless dent repair or touch-up may be enough.",
            ],
            Severity::Moderate => vec![
                "Get at least two quotes, including one from an authorized service center.",
                "Compare the estimate with your deductible before filing a claim.",
            ],
            Severity::Severe => vec![
                "Do not drive the vehicle until it has been inspected.",
                "Contact your insurer and arrange towing.",
                "Use an authorized service center for structural repairs.",
            ],
        },
    };
    if mode == AnalysisMode::QuotaFallback {
        out.insert(0, "This is a demo estimate; retry later for a full AI assessment.");
    }
    out.into_iter().map(str::to_string).collect()
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
#[path = "builder_test.rs"]
mod tests;
