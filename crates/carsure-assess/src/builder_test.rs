use rand::rngs::StdRng;
use rand::SeedableRng;

use super::*;
use crate::detector::{boxes_to_regions, DetectorBox, DetectorResponse};

const TOYOTA_REPLY: &str = "\
**Vehicle Identification**
Make: Toyota, Model: Camry, Year: 2020, confidence: 90%

Damage Type: Dent
Severity: Moderate
Description: A fist-sized dent on the rear passenger door.

Estimated repair: ₹18,000 (conservative) to ₹28,000 (comprehensive).

```json
{\"regions\": [{\"id\": \"region_1\", \"x\": 55, \"y\": 40, \"width\": 20, \"height\": 15,
  \"damageType\": \"Dent\", \"severity\": \"moderate\", \"confidence\": 0.9}]}
```";

#[test]
fn success_reply_fills_every_section() {
    let result = parse_ai_response_to_damage_result(TOYOTA_REPLY, Vec::new());

    assert_eq!(result.analysis_mode, AnalysisMode::Success);
    assert!(!result.demo_mode);
    assert_eq!(result.vehicle_identification.make, "Toyota");
    assert_eq!(result.vehicle_identification.model, "Camry");
    assert_eq!(result.vehicle_identification.year, "2020");
    assert!((result.vehicle_identification.confidence - 0.9).abs() < 1e-9);
    assert_eq!(
        result.vehicle_identification.market_segment,
        MarketSegment::MidRange
    );
    assert_eq!(result.damage_type, "Dent");
    assert_eq!(result.severity, Severity::Moderate);
    assert_eq!(
        result.description,
        "A fist-sized dent on the rear passenger door."
    );
    assert_eq!(result.enhanced_repair_cost.conservative.rupees, "₹18,000");
    assert_eq!(result.enhanced_repair_cost.comprehensive.rupees, "₹28,000");
    assert_eq!(result.identified_damage_regions.len(), 1);
    assert_eq!(
        result.insurance_recommendation.claim_recommendation,
        ClaimRecommendation::FileClaim
    );
    assert_eq!(result.safety_assessment.status, SafetyStatus::Caution);
    assert!(!result.recommendations.is_empty());
}

#[test]
fn detector_regions_are_merged_after_llm_regions() {
    let detected = boxes_to_regions(
        &DetectorResponse {
            image_width: Some(100.0),
            image_height: Some(100.0),
            boxes: vec![DetectorBox {
                x1: 10.0,
                y1: 10.0,
                x2: 20.0,
                y2: 20.0,
                label: "scratch".to_string(),
                confidence: 0.6,
            }],
        },
        None,
    );
    let result = parse_ai_response_to_damage_result(TOYOTA_REPLY, detected);
    let ids: Vec<&str> = result
        .identified_damage_regions
        .iter()
        .map(|r| r.id.as_str())
        .collect();
    assert_eq!(ids, vec!["region_1", "cnn_1"]);
    assert_eq!(
        result.identified_damage_regions[1].source,
        RegionSource::Detector
    );
}

#[test]
fn missing_costs_use_severity_base_scaled_by_segment() {
    let text = "Make: BMW\nModel: 3 Series\nDamage Type: Scratch\nSeverity: minor";
    let result = parse_ai_response_to_damage_result(text, Vec::new());
    assert_eq!(
        result.vehicle_identification.market_segment,
        MarketSegment::Luxury
    );
    // 8,000 minor base x 5.0 luxury multiplier.
    assert_eq!(result.enhanced_repair_cost.conservative.rupees, "₹40,000");
    assert_eq!(result.enhanced_repair_cost.comprehensive.rupees, "₹64,000");
    assert!((result.enhanced_repair_cost.segment_multiplier - 5.0).abs() < f64::EPSILON);
}

#[test]
fn no_damage_reply_has_zero_cost_and_no_regions() {
    let text = "Make: Honda\nModel: City\nDamage Type: No visible damage\n\
                The car is in good condition. Estimated repair: ₹5,000\n\
                ```json\n{\"regions\": [{\"x\": 1, \"y\": 1, \"width\": 5, \"height\": 5}]}\n```";
    let result = parse_ai_response_to_damage_result(text, Vec::new());

    assert_eq!(result.analysis_mode, AnalysisMode::NoDamage);
    assert_eq!(result.enhanced_repair_cost.conservative.rupees, "₹0");
    assert_eq!(result.enhanced_repair_cost.comprehensive.rupees, "₹0");
    assert!(result.identified_damage_regions.is_empty());
    assert_eq!(result.safety_assessment.status, SafetyStatus::Safe);
    assert!(result.safety_assessment.driveable);
    assert_eq!(
        result.insurance_recommendation.claim_recommendation,
        ClaimRecommendation::NotApplicable
    );
    assert_eq!(result.vehicle_identification.make, "Honda");
}

#[test]
fn identification_required_reply() {
    let text = "LOW CONFIDENCE (30%)\nENHANCED ANALYSIS REQUEST: the badge is not visible.\n\
                Possible dent near the wheel arch, ₹12,000.";
    let result = parse_ai_response_to_damage_result(text, Vec::new());

    assert_eq!(result.analysis_mode, AnalysisMode::IdentificationRequired);
    assert_eq!(result.damage_type, "Vehicle Identification Required");
    assert!((result.confidence - 0.3).abs() < 1e-9);
    assert!(result.identified_damage_regions.is_empty());
    assert_eq!(result.enhanced_repair_cost.conservative.rupees, "₹0");
    assert_eq!(result.severity, Severity::None);
}

#[test]
fn template_enforces_zero_cost_modes() {
    let result = ResultTemplate {
        mode: AnalysisMode::NoDamage,
        damage_type: "No Damage".to_string(),
        confidence: 1.0,
        severity: Severity::Severe,
        description: String::new(),
        regions: vec![DamageRegion {
            id: "stray".to_string(),
            x: 0.0,
            y: 0.0,
            width: 1.0,
            height: 1.0,
            damage_type: "Dent".to_string(),
            severity: Severity::Severe,
            confidence: 1.0,
            source: RegionSource::Llm,
        }],
        vehicle: VehicleFields::unknown(),
        conservative_inr: 99_000.0,
        comprehensive_inr: 99_000.0,
        demo_mode: false,
    }
    .build();
    assert!(result.identified_damage_regions.is_empty());
    assert!(result.enhanced_repair_cost.conservative.amount.abs() < f64::EPSILON);
    assert_eq!(result.severity, Severity::None);
}

#[test]
fn quota_fallback_is_demo_and_internally_consistent() {
    for seed in 0..20 {
        let mut rng = StdRng::seed_from_u64(seed);
        let result = build_quota_fallback_result(&mut rng, Vec::new());

        assert_eq!(result.analysis_mode, AnalysisMode::QuotaFallback);
        assert!(result.demo_mode);
        assert!(!result.identified_damage_regions.is_empty());
        assert!(result.identified_damage_regions.len() <= 3);
        for region in &result.identified_damage_regions {
            assert_eq!(region.severity, result.severity);
            assert_eq!(region.damage_type, result.damage_type);
            assert_eq!(region.source, RegionSource::Synthetic);
            assert!(region.x + region.width <= 100.0);
            assert!(region.y + region.height <= 100.0);
        }

        let base = fallback_base_cost(result.severity, MarketSegment::MidRange);
        let conservative = result.enhanced_repair_cost.conservative.amount;
        assert!(conservative >= (base * 0.85).floor() && conservative <= (base * 1.15).ceil());
        assert!(result.enhanced_repair_cost.comprehensive.amount > conservative);
        assert!(result.recommendations[0].contains("demo"));
    }
}

#[test]
fn quota_fallback_is_reproducible_for_a_seed() {
    let a = build_quota_fallback_result(&mut StdRng::seed_from_u64(7), Vec::new());
    let b = build_quota_fallback_result(&mut StdRng::seed_from_u64(7), Vec::new());
    assert_eq!(a, b);
}

#[test]
fn small_estimates_recommend_paying_directly() {
    let text = "Make: Maruti\nDamage Type: Scratch\nSeverity: minor\nCost: ₹4,500";
    let result = parse_ai_response_to_damage_result(text, Vec::new());
    assert_eq!(
        result.insurance_recommendation.claim_recommendation,
        ClaimRecommendation::PayOutOfPocket
    );
    assert_eq!(
        result.insurance_recommendation.estimated_deductible.rupees,
        "₹1,000"
    );
}

#[test]
fn severe_damage_is_not_driveable() {
    let text = "Damage Type: Front collision\nSeverity: Severe\n₹2,40,000";
    let result = parse_ai_response_to_damage_result(text, Vec::new());
    assert_eq!(result.safety_assessment.status, SafetyStatus::Unsafe);
    assert!(!result.safety_assessment.driveable);
    assert!(result.insurance_recommendation.idv_note.contains("IDV"));
}

#[test]
fn unreadable_reply_is_zeroed_not_invented() {
    let text = "I am unable to see a vehicle in this picture.";
    let detected = boxes_to_regions(
        &DetectorResponse {
            image_width: Some(100.0),
            image_height: Some(100.0),
            boxes: vec![DetectorBox {
                x1: 10.0,
                y1: 10.0,
                x2: 60.0,
                y2: 60.0,
                label: "dent".to_string(),
                confidence: 0.9,
            }],
        },
        None,
    );
    let result = parse_ai_response_to_damage_result(text, detected);

    assert_eq!(result.damage_type, "Unknown");
    assert_eq!(result.severity, Severity::None);
    assert_eq!(result.enhanced_repair_cost.conservative.rupees, "₹0");
    assert_eq!(result.enhanced_repair_cost.comprehensive.rupees, "₹0");
    assert!(result.identified_damage_regions.is_empty());
    assert_eq!(
        result.insurance_recommendation.claim_recommendation,
        ClaimRecommendation::NotApplicable
    );
    assert_eq!(result.safety_assessment.status, SafetyStatus::Caution);
    assert!(!result.recommendations.is_empty());
}

#[test]
fn unstated_severity_and_cost_use_extractor_defaults() {
    let text = "Make: Toyota\nModel: Innova\nDamage Type: Dent\nDescription: Dent on the tailgate.";
    let result = parse_ai_response_to_damage_result(text, Vec::new());

    assert_eq!(result.analysis_mode, AnalysisMode::Success);
    assert_eq!(result.damage_type, "Dent");
    assert_eq!(result.enhanced_repair_cost.conservative.rupees, "₹15,000");
    assert_eq!(result.enhanced_repair_cost.comprehensive.rupees, "₹25,000");
}
