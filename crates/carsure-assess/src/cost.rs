//! Fixed-ratio repair cost normalization.

use carsure_core::money::{cost_amount, parse_amount, INR_PER_USD};
use carsure_core::{
    CostBreakdown, EnhancedRepairCost, MarketSegment, RegionalCosts, ServiceTypeCosts, Severity,
};

pub const PARTS_SHARE: f64 = 0.40;
pub const LABOR_SHARE: f64 = 0.35;
pub const MATERIALS_SHARE: f64 = 0.25;

pub const AUTHORIZED_MULTIPLIER: f64 = 1.25;
pub const MULTI_BRAND_MULTIPLIER: f64 = 1.0;
pub const LOCAL_MULTIPLIER: f64 = 0.75;

pub const METRO_MULTIPLIER: f64 = 1.2;
pub const TIER1_MULTIPLIER: f64 = 1.0;
pub const TIER2_MULTIPLIER: f64 = 0.85;

/// Comprehensive estimate relative to conservative when only one figure is known.
pub const COMPREHENSIVE_FACTOR: f64 = 1.6;

pub const CURRENCY: &str = "INR";

/// Makes are matched case-insensitively on the full name or its leading word.
const SEGMENT_TABLE: &[(MarketSegment, &[&str])] = &[
    (
        MarketSegment::UltraLuxury,
        &[
            "rolls-royce",
            "rolls royce",
            "bentley",
            "lamborghini",
            "ferrari",
            "bugatti",
            "mclaren",
            "aston martin",
        ],
    ),
    (
        MarketSegment::Luxury,
        &[
            "mercedes-benz",
            "mercedes",
            "bmw",
            "audi",
            "porsche",
            "maserati",
        ],
    ),
    (
        MarketSegment::Premium,
        &[
            "lexus",
            "volvo",
            "jaguar",
            "land rover",
            "range rover",
            "mini",
            "tesla",
            "infiniti",
            "acura",
            "genesis",
            "cadillac",
        ],
    ),
    (
        MarketSegment::Economy,
        &[
            "maruti", "suzuki", "tata", "renault", "datsun", "chevrolet", "fiat",
        ],
    ),
];

#[must_use]
pub fn segment_for_make(make: &str) -> MarketSegment {
    let normalized = make.trim().to_lowercase();
    SEGMENT_TABLE
        .iter()
        .find(|(_, makes)| {
            makes.iter().any(|m| {
                normalized == *m
                    || normalized
                        .strip_prefix(m)
                        .is_some_and(|rest| rest.starts_with([' ', '-']))
            })
        })
        .map_or(MarketSegment::MidRange, |(segment, _)| *segment)
}

#[must_use]
pub fn segment_multiplier(segment: MarketSegment) -> f64 {
    match segment {
        MarketSegment::Economy => 0.8,
        MarketSegment::MidRange => 1.0,
        MarketSegment::Premium => 2.5,
        MarketSegment::Luxury => 5.0,
        MarketSegment::UltraLuxury => 12.0,
    }
}

/// Rupee base cost used when the reply states none, scaled to the segment.
#[must_use]
pub fn fallback_base_cost(severity: Severity, segment: MarketSegment) -> f64 {
    let base = match severity {
        Severity::None => 0.0,
        Severity::Minor => 8_000.0,
        Severity::Moderate => 25_000.0,
        Severity::Severe => 60_000.0,
    };
    base * segment_multiplier(segment)
}

/// Reads a money string from the reply as rupees; dollar figures are
/// converted at the fixed rate.
#[must_use]
pub fn rupees_from_text(raw: &str) -> Option<f64> {
    let amount = parse_amount(raw)?;
    if raw.trim_start().starts_with('$') {
        Some(amount * INR_PER_USD)
    } else {
        Some(amount)
    }
}

/// Expands a conservative/comprehensive pair into the full cost structure.
///
/// Breakdown, service-type, and regional figures are all derived from the
/// conservative amount. The amounts are taken as given: `segment` is not
/// applied here. It scales only the severity base costs from
/// [`fallback_base_cost`], so `segment_multiplier` in the output is
/// informational and LLM-stated costs are never multiplied by it.
#[must_use]
pub fn estimate_repair_cost(
    conservative_inr: f64,
    comprehensive_inr: f64,
    segment: MarketSegment,
) -> EnhancedRepairCost {
    let base = conservative_inr;
    EnhancedRepairCost {
        conservative: cost_amount(conservative_inr),
        comprehensive: cost_amount(comprehensive_inr),
        breakdown: CostBreakdown {
            parts: cost_amount(base * PARTS_SHARE),
            labor: cost_amount(base * LABOR_SHARE),
            materials: cost_amount(base * MATERIALS_SHARE),
        },
        service_types: ServiceTypeCosts {
            authorized: cost_amount(base * AUTHORIZED_MULTIPLIER),
            multi_brand: cost_amount(base * MULTI_BRAND_MULTIPLIER),
            local: cost_amount(base * LOCAL_MULTIPLIER),
        },
        regional_variations: RegionalCosts {
            metro: cost_amount(base * METRO_MULTIPLIER),
            tier1: cost_amount(base * TIER1_MULTIPLIER),
            tier2: cost_amount(base * TIER2_MULTIPLIER),
        },
        market_segment: segment,
        segment_multiplier: segment_multiplier(segment),
        currency: CURRENCY.to_string(),
    }
}

/// All-zero cost structure for modes that carry no repair estimate.
#[must_use]
pub fn zero_repair_cost(segment: MarketSegment) -> EnhancedRepairCost {
    estimate_repair_cost(0.0, 0.0, segment)
}
