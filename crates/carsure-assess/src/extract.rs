//! Best-effort field extraction from free-form model replies.
//!
//! Every field has an ordered list of patterns; the first pattern that yields
//! a non-empty capture wins. Nothing here fails: missing fields come back as
//! [`UNKNOWN`] or a numeric default.

use std::sync::LazyLock;

use carsure_core::{DamageRegion, RegionSource, Severity};
use regex::Regex;
use serde_json::Value;

pub const UNKNOWN: &str = "Unknown";
pub const DEFAULT_CONSERVATIVE_COST: &str = "₹15,000";
pub const DEFAULT_COMPREHENSIVE_COST: &str = "₹25,000";
pub const DEFAULT_DAMAGE_CONFIDENCE: f64 = 0.75;
pub const IDENTIFICATION_REQUIRED: &str = "Vehicle Identification Required";

#[derive(Debug, Clone, PartialEq)]
pub struct VehicleFields {
    pub make: String,
    pub model: String,
    pub year: String,
    pub trim: String,
    /// 0.0 when the reply states no identification confidence.
    pub confidence: f64,
}

impl VehicleFields {
    #[must_use]
    pub fn unknown() -> Self {
        Self {
            make: UNKNOWN.to_string(),
            model: UNKNOWN.to_string(),
            year: UNKNOWN.to_string(),
            trim: UNKNOWN.to_string(),
            confidence: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepairCosts {
    pub conservative: String,
    pub comprehensive: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DamageAssessment {
    pub damage_type: String,
    pub confidence: f64,
    pub severity: Severity,
    pub identification_required: bool,
}

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(p).expect("valid regex"))
        .collect()
}

static MAKE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"(?i)\bmake\s*[:\-]\s*\**\s*([^,\n*]+)",
        r"(?i)\bmanufacturer\s*[:\-]\s*\**\s*([^,\n*]+)",
        r"(?i)\bbrand\s*[:\-]\s*\**\s*([^,\n*]+)",
        r"(?i)\bvehicle\s*[:\-]\s*\**\s*(?:(?:19|20)\d{2}\s+)?([A-Za-z][A-Za-z\-]+)",
    ])
});

static MODEL_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"(?i)\bmodel\s*[:\-]\s*\**\s*([^,\n*]+)",
        r"(?i)\bvehicle\s*[:\-]\s*\**\s*(?:(?:19|20)\d{2}\s+)?[A-Za-z][A-Za-z\-]+\s+([A-Za-z0-9\-]+)",
    ])
});

static YEAR_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"(?i)\byear\s*[:\-]\s*\**\s*((?:19|20)\d{2})",
        r"(?i)\b((?:19|20)\d{2})\s+model\b",
        r"\b((?:19|20)\d{2})\s+[A-Z][a-z]+",
    ])
});

static TRIM_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"(?i)\btrim(?:\s*level)?\s*[:\-]\s*\**\s*([^,\n*]+)",
        r"(?i)\bvariant\s*[:\-]\s*\**\s*([^,\n*]+)",
    ])
});

static VEHICLE_CONFIDENCE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"(?i)identification\s+confidence\s*[:\-]?\s*\**\s*(-?\d+(?:\.\d+)?)",
        r"(?i)\bconfidence\s*[:\-]\s*\**\s*(-?\d+(?:\.\d+)?)",
        r"(?i)\bconfidence\s*\(\s*(-?\d+(?:\.\d+)?)\s*%\s*\)",
    ])
});

static DAMAGE_CONFIDENCE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"(?i)damage\s+confidence\s*[:\-]?\s*\**\s*(-?\d+(?:\.\d+)?)",
        r"(?i)\bconfidence\s*[:\-]\s*\**\s*(-?\d+(?:\.\d+)?)",
        r"(?i)(-?\d+(?:\.\d+)?)\s*%\s+confiden(?:t|ce)",
    ])
});

static DAMAGE_TYPE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"(?i)damage\s*type\s*[:\-]\s*\**\s*([^,\n*]+)",
        r"(?i)type\s+of\s+damage\s*[:\-]\s*\**\s*([^,\n*]+)",
        r"(?i)primary\s+damage\s*[:\-]\s*\**\s*([^,\n*]+)",
    ])
});

static SEVERITY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)severity(?:\s*level)?\s*[:\-]\s*\**\s*([A-Za-z]+)").expect("valid regex")
});

static LOW_CONFIDENCE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)LOW\s+CONFIDENCE\s*\(\s*(-?\d+(?:\.\d+)?)\s*%?\s*\)").expect("valid regex")
});

static MONEY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[₹$]\s?\d[\d,]*(?:\.\d+)?").expect("valid regex"));

static FENCED_JSON_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(?:json)?\s*(.*?)```").expect("valid regex"));

/// Keyword fallbacks when no labelled damage type is present, most specific first.
static DAMAGE_KEYWORDS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r"(?i)\b(?:shatter(?:ed)?|windshield|windscreen)\b", "Glass Damage"),
        (r"(?i)\bcrack(?:s|ed)?\b", "Crack"),
        (r"(?i)\bdent(?:s|ed)?\b", "Dent"),
        (r"(?i)\bscratch(?:es|ed)?\b", "Scratch"),
        (r"(?i)\bbumper\b", "Bumper Damage"),
        (r"(?i)\bbroken\b", "Broken Part"),
        (r"(?i)\brust(?:ed|y)?\b", "Rust"),
        (r"(?i)\bpaint\b", "Paint Damage"),
        (r"(?i)\bcollision\b", "Collision Damage"),
    ]
    .into_iter()
    .map(|(p, label)| (Regex::new(p).expect("valid regex"), label))
    .collect()
});

/// First non-empty capture across `patterns`, with surrounding markdown and
/// punctuation stripped.
fn first_capture(patterns: &[Regex], text: &str) -> Option<String> {
    patterns.iter().find_map(|re| {
        let caps = re.captures(text)?;
        let value = caps
            .get(1)?
            .as_str()
            .trim()
            .trim_matches(|c: char| matches!(c, '*' | '"' | '\'' | '.' | '`'))
            .trim();
        (!value.is_empty()).then(|| value.to_string())
    })
}

/// Percent-like number to a fraction: `90` -> `0.9`, `0.9` -> `0.9`.
///
/// Not clamped: `150%` comes back as `1.5` and a negative capture stays
/// negative.
fn normalize_confidence(raw: f64) -> f64 {
    if raw > 1.0 {
        raw / 100.0
    } else {
        raw
    }
}

fn first_confidence(patterns: &[Regex], text: &str) -> Option<f64> {
    first_capture(patterns, text)
        .and_then(|s| s.parse::<f64>().ok())
        .map(normalize_confidence)
}

#[must_use]
pub fn extract_vehicle_fields(text: &str) -> VehicleFields {
    let or_unknown = |v: Option<String>| v.unwrap_or_else(|| UNKNOWN.to_string());
    VehicleFields {
        make: or_unknown(first_capture(&MAKE_PATTERNS, text)),
        model: or_unknown(first_capture(&MODEL_PATTERNS, text)),
        year: or_unknown(first_capture(&YEAR_PATTERNS, text)),
        trim: or_unknown(first_capture(&TRIM_PATTERNS, text)),
        confidence: first_confidence(&VEHICLE_CONFIDENCE_PATTERNS, text).unwrap_or(0.0),
    }
}

/// Conservative is the first money token in the text, comprehensive the
/// second (or a copy of the first). `None` when the text has no money token.
#[must_use]
pub fn find_repair_costs(text: &str) -> Option<RepairCosts> {
    let mut amounts = MONEY_PATTERN
        .find_iter(text)
        .map(|m| m.as_str().split_whitespace().collect::<String>());

    let conservative = amounts.next()?;
    let comprehensive = amounts.next().unwrap_or_else(|| conservative.clone());
    Some(RepairCosts {
        conservative,
        comprehensive,
    })
}

/// [`find_repair_costs`] with the fixed `₹15,000` / `₹25,000` defaults.
#[must_use]
pub fn extract_repair_costs(text: &str) -> RepairCosts {
    find_repair_costs(text).unwrap_or_else(|| RepairCosts {
        conservative: DEFAULT_CONSERVATIVE_COST.to_string(),
        comprehensive: DEFAULT_COMPREHENSIVE_COST.to_string(),
    })
}

#[must_use]
pub fn determine_damage_type_and_confidence(text: &str) -> DamageAssessment {
    if text.to_uppercase().contains("ENHANCED ANALYSIS REQUEST") {
        if let Some(raw) = LOW_CONFIDENCE_PATTERN
            .captures(text)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<f64>().ok())
        {
            return DamageAssessment {
                damage_type: IDENTIFICATION_REQUIRED.to_string(),
                confidence: normalize_confidence(raw),
                severity: Severity::None,
                identification_required: true,
            };
        }
    }

    let damage_type = first_capture(&DAMAGE_TYPE_PATTERNS, text)
        .or_else(|| {
            DAMAGE_KEYWORDS
                .iter()
                .find(|(re, _)| re.is_match(text))
                .map(|(_, label)| (*label).to_string())
        })
        .unwrap_or_else(|| UNKNOWN.to_string());

    let confidence =
        first_confidence(&DAMAGE_CONFIDENCE_PATTERNS, text).unwrap_or(DEFAULT_DAMAGE_CONFIDENCE);

    DamageAssessment {
        damage_type,
        confidence,
        severity: extract_severity(text),
        identification_required: false,
    }
}

fn extract_severity(text: &str) -> Severity {
    stated_severity(text).unwrap_or(Severity::Moderate)
}

/// The severity the reply names, by label or by keyword.
#[must_use]
pub fn stated_severity(text: &str) -> Option<Severity> {
    if let Some(sev) = SEVERITY_PATTERN
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| Severity::from_label(m.as_str()))
    {
        return Some(sev);
    }
    let lower = text.to_lowercase();
    if lower.contains("severe") || lower.contains("major damage") {
        Some(Severity::Severe)
    } else if lower.contains("moderate") {
        Some(Severity::Moderate)
    } else if lower.contains("minor") || lower.contains("superficial") {
        Some(Severity::Minor)
    } else {
        None
    }
}

/// A one-paragraph summary: the labelled description if present, otherwise
/// the first prose line.
#[must_use]
pub fn extract_description(text: &str) -> String {
    static DESCRIPTION: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?i)\bdescription\s*[:\-]\s*\**\s*([^\n]+)").expect("valid regex")
    });
    if let Some(desc) = DESCRIPTION
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().trim_matches('*').trim())
        .filter(|s| !s.is_empty())
    {
        return desc.to_string();
    }
    text.lines()
        .map(str::trim)
        .find(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with("```"))
        .map(|line| line.trim_matches('*').trim().chars().take(280).collect())
        .unwrap_or_default()
}

/// Regions the model declared itself, from a fenced JSON block or the
/// outermost bare JSON object.
///
/// Accepts an array of regions or an object holding one under `regions`,
/// `damageRegions`, or `identifiedDamageRegions`. Entries without usable
/// coordinates are skipped. Coordinates that all fall in `0..=1` are read as
/// fractions and scaled to percent.
#[must_use]
pub fn extract_llm_regions(text: &str, default_confidence: f64) -> Vec<DamageRegion> {
    let mut candidates: Vec<&str> = FENCED_JSON_PATTERN
        .captures_iter(text)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect();
    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        if start < end {
            candidates.push(&text[start..=end]);
        }
    }

    for candidate in candidates {
        let Ok(value) = serde_json::from_str::<Value>(candidate.trim()) else {
            continue;
        };
        let items = match &value {
            Value::Array(items) => items.as_slice(),
            Value::Object(obj) => {
                match ["regions", "damageRegions", "identifiedDamageRegions"]
                    .iter()
                    .find_map(|k| obj.get(*k).and_then(Value::as_array))
                {
                    Some(items) => items.as_slice(),
                    None => continue,
                }
            }
            _ => continue,
        };
        let regions: Vec<DamageRegion> = items
            .iter()
            .enumerate()
            .filter_map(|(i, item)| region_from_value(i, item, default_confidence))
            .collect();
        if !regions.is_empty() {
            return regions;
        }
    }
    Vec::new()
}

fn number(value: &Value, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|k| match value.get(*k)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').parse().ok(),
        _ => None,
    })
}

fn region_from_value(index: usize, item: &Value, default_confidence: f64) -> Option<DamageRegion> {
    let mut x = number(item, &["x", "left"])?;
    let mut y = number(item, &["y", "top"])?;
    let mut width = number(item, &["width", "w"])?;
    let mut height = number(item, &["height", "h"])?;
    if [x, y, width, height].iter().all(|v| (0.0..=1.0).contains(v)) {
        x *= 100.0;
        y *= 100.0;
        width *= 100.0;
        height *= 100.0;
    }

    let text_field = |keys: &[&str]| {
        keys.iter()
            .find_map(|k| item.get(*k).and_then(Value::as_str))
            .map(str::to_string)
    };

    Some(DamageRegion {
        id: text_field(&["id"]).unwrap_or_else(|| format!("region_{}", index + 1)),
        x,
        y,
        width,
        height,
        damage_type: text_field(&["damageType", "damage_type", "type", "label"])
            .unwrap_or_else(|| UNKNOWN.to_string()),
        severity: text_field(&["severity"])
            .and_then(|s| Severity::from_label(&s))
            .unwrap_or(Severity::Moderate),
        confidence: number(item, &["confidence"])
            .map_or(default_confidence, normalize_confidence),
        source: RegionSource::Llm,
    })
}

#[cfg(test)]
#[path = "extract_test.rs"]
mod tests;
