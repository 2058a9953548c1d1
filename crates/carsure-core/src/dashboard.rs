//! Dashboard statistics computed in memory from stored analysis history.
//!
//! Input is the raw JSON pulled from Firebase, keyed by user id. Records are
//! read leniently: anything that is not a JSON object is skipped, and missing
//! fields fall back to "Unknown" or zero.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::money::parse_amount;

/// `uid -> { "analysis_history": { id: record, ... }, ... }`.
pub type UsersData = BTreeMap<String, Value>;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentAnalysis {
    pub id: String,
    pub user_id: String,
    pub uploaded_at: String,
    pub filename: String,
    pub damage_type: String,
    pub severity: String,
    pub estimated_cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyTrend {
    /// `YYYY-MM`.
    pub month: String,
    pub count: usize,
    pub total_cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardData {
    pub total_analyses: usize,
    pub total_users: usize,
    pub total_estimated_cost: f64,
    pub average_repair_cost: f64,
    pub average_confidence: f64,
    pub damage_type_distribution: BTreeMap<String, usize>,
    pub severity_distribution: BTreeMap<String, usize>,
    pub recent_analyses: Vec<RecentAnalysis>,
    pub monthly_trends: Vec<MonthlyTrend>,
}

impl DashboardData {
    /// The zero-state payload served when nothing is stored or a fetch failed.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            total_analyses: 0,
            total_users: 0,
            total_estimated_cost: 0.0,
            average_repair_cost: 0.0,
            average_confidence: 0.0,
            damage_type_distribution: BTreeMap::new(),
            severity_distribution: BTreeMap::new(),
            recent_analyses: Vec::new(),
            monthly_trends: Vec::new(),
        }
    }
}

#[derive(Default)]
struct MonthBucket {
    count: usize,
    total_cost: f64,
}

/// Aggregates every user's analysis history in a single pass.
///
/// `recent_limit` caps `recentAnalyses`; the list is sorted by the
/// `uploadedAt` string descending, which matches chronological order for
/// ISO 8601 timestamps.
#[must_use]
pub fn process_dashboard_data(users: &UsersData, recent_limit: usize) -> DashboardData {
    if users.is_empty() {
        return DashboardData::empty();
    }

    let mut total_analyses = 0usize;
    let mut total_cost = 0.0_f64;
    let mut confidence_sum = 0.0_f64;
    let mut confidence_count = 0usize;
    let mut damage_types: BTreeMap<String, usize> = BTreeMap::new();
    let mut severities: BTreeMap<String, usize> = BTreeMap::new();
    let mut months: BTreeMap<String, MonthBucket> = BTreeMap::new();
    let mut recent: Vec<RecentAnalysis> = Vec::new();

    for (uid, user) in users {
        for (id, record) in history_entries(user) {
            let Some(obj) = record.as_object() else {
                continue;
            };
            let structured = obj
                .get("structuredData")
                .or_else(|| obj.get("structured_data"))
                .unwrap_or(&Value::Null);

            let damage_type = str_field(structured, "damageType").unwrap_or("Unknown");
            let severity = str_field(structured, "severity").unwrap_or("unknown");
            let cost = record_cost(structured);
            let uploaded_at = str_field(record, "uploadedAt")
                .or_else(|| str_field(record, "timestamp"))
                .unwrap_or_default();

            total_analyses += 1;
            total_cost += cost;
            if let Some(c) = structured.get("confidence").and_then(Value::as_f64) {
                confidence_sum += c;
                confidence_count += 1;
            }
            *damage_types.entry(damage_type.to_string()).or_default() += 1;
            *severities.entry(severity.to_lowercase()).or_default() += 1;

            if let Some(month) = month_key(uploaded_at) {
                let bucket = months.entry(month.to_string()).or_default();
                bucket.count += 1;
                bucket.total_cost += cost;
            }

            recent.push(RecentAnalysis {
                id: str_field(record, "id").map_or_else(|| id.clone(), str::to_string),
                user_id: uid.clone(),
                uploaded_at: uploaded_at.to_string(),
                filename: str_field(record, "filename")
                    .unwrap_or("unknown")
                    .to_string(),
                damage_type: damage_type.to_string(),
                severity: severity.to_lowercase(),
                estimated_cost: cost,
            });
        }
    }

    recent.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
    recent.truncate(recent_limit);

    #[allow(clippy::cast_precision_loss)]
    let average_repair_cost = if total_analyses == 0 {
        0.0
    } else {
        round2(total_cost / total_analyses as f64)
    };
    #[allow(clippy::cast_precision_loss)]
    let average_confidence = if confidence_count == 0 {
        0.0
    } else {
        round2(confidence_sum / confidence_count as f64)
    };

    DashboardData {
        total_analyses,
        total_users: users.len(),
        total_estimated_cost: round2(total_cost),
        average_repair_cost,
        average_confidence,
        damage_type_distribution: damage_types,
        severity_distribution: severities,
        recent_analyses: recent,
        monthly_trends: months
            .into_iter()
            .map(|(month, b)| MonthlyTrend {
                month,
                count: b.count,
                total_cost: round2(b.total_cost),
            })
            .collect(),
    }
}

/// Yields `(id, record)` pairs from a user node.
///
/// Firebase returns keyed children as an object, but numeric keys can come
/// back as a sparse array; both are accepted and `null` holes are skipped.
fn history_entries(user: &Value) -> Vec<(String, &Value)> {
    let history = user
        .get("analysis_history")
        .or_else(|| user.get("analysisHistory"));
    match history {
        Some(Value::Object(map)) => map.iter().map(|(k, v)| (k.clone(), v)).collect(),
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .filter(|(_, v)| !v.is_null())
            .map(|(i, v)| (i.to_string(), v))
            .collect(),
        _ => Vec::new(),
    }
}

fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str)
}

fn record_cost(structured: &Value) -> f64 {
    let conservative = &structured["enhancedRepairCost"]["conservative"];
    conservative
        .get("amount")
        .and_then(Value::as_f64)
        .or_else(|| {
            conservative
                .get("rupees")
                .and_then(Value::as_str)
                .and_then(parse_amount)
        })
        .unwrap_or(0.0)
}

/// `"2024-03-18T10:00:00Z"` -> `"2024-03"`.
fn month_key(timestamp: &str) -> Option<&str> {
    let key = timestamp.get(..7)?;
    let bytes = key.as_bytes();
    let well_formed = bytes[..4].iter().all(u8::is_ascii_digit)
        && bytes[4] == b'-'
        && bytes[5..].iter().all(u8::is_ascii_digit);
    well_formed.then_some(key)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
#[path = "dashboard_test.rs"]
mod tests;
