use carsure_core::AnalysisMode;

use crate::extract::DamageAssessment;

const NO_DAMAGE_PHRASES: &[&str] = &[
    "no damage",
    "no visible damage",
    "no significant damage",
    "good condition",
    "undamaged",
];

#[must_use]
pub fn mentions_no_damage(text: &str) -> bool {
    let lower = text.to_lowercase();
    NO_DAMAGE_PHRASES.iter().any(|p| lower.contains(p))
}

/// Picks the response mode for a reply the provider returned successfully.
///
/// Quota fallback is not decided here; it comes from the provider error.
/// The no-damage check is a substring heuristic: it fires when the damage
/// type itself says so, or when the prose says so and no damage type could
/// be read.
#[must_use]
pub fn classify_response(text: &str, damage: &DamageAssessment) -> AnalysisMode {
    if damage.identification_required {
        return AnalysisMode::IdentificationRequired;
    }
    if mentions_no_damage(&damage.damage_type) {
        return AnalysisMode::NoDamage;
    }
    if damage.damage_type == crate::extract::UNKNOWN && mentions_no_damage(text) {
        return AnalysisMode::NoDamage;
    }
    AnalysisMode::Success
}
