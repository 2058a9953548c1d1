//! Typed reads and writes over the `/users/{uid}/...` layout.
//!
//! ```text
//! users/{uid}/profile
//! users/{uid}/analysis_history/{id}
//! users/{uid}/vehicles/{id}
//! ```

use carsure_core::{AnalysisRecord, UserProfile, Vehicle};
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::client::{FirebaseClient, Query};
use crate::error::FirebaseError;
use crate::query::get_ordered_with_fallback;

fn user_path(uid: &str, rest: &str) -> String {
    format!("users/{uid}/{rest}")
}

/// Which profile counter to bump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileCounter {
    TotalAnalyses,
    TotalVehicles,
}

impl ProfileCounter {
    fn field(self) -> &'static str {
        match self {
            ProfileCounter::TotalAnalyses => "total_analyses",
            ProfileCounter::TotalVehicles => "total_vehicles",
        }
    }
}

/// Input for [`save_vehicle`]; id and timestamp are assigned on save.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewVehicle {
    pub make: String,
    pub model: String,
    pub year: String,
    #[serde(default)]
    pub registration_number: Option<String>,
}

/// Writes the record at `users/{uid}/analysis_history/{id}`.
///
/// # Errors
///
/// Returns [`FirebaseError`] if the write fails.
pub async fn save_analysis(
    client: &FirebaseClient,
    record: &AnalysisRecord,
    auth: Option<&str>,
) -> Result<(), FirebaseError> {
    client
        .child(&user_path(&record.user_id, "analysis_history"))
        .child(&record.id)
        .set(record, auth)
        .await?;
    tracing::info!(uid = %record.user_id, record_id = %record.id, "saved analysis record");
    Ok(())
}

/// Raw `analysis_history` node for one user, newest `limit` entries when the
/// server can order them.
///
/// # Errors
///
/// Returns [`FirebaseError`] if every read attempt fails.
pub async fn fetch_history_raw(
    client: &FirebaseClient,
    uid: &str,
    limit: Option<usize>,
    auth: Option<&str>,
) -> Result<Value, FirebaseError> {
    let node = client.child(&user_path(uid, "analysis_history"));
    get_ordered_with_fallback(&node, client.list_timeout(), limit, auth).await
}

/// Newest-first history for one user, at most `limit` records.
///
/// Entries that do not decode as [`AnalysisRecord`] are logged and skipped.
///
/// # Errors
///
/// Returns [`FirebaseError`] if the read fails.
pub async fn list_analysis_history(
    client: &FirebaseClient,
    uid: &str,
    limit: usize,
    auth: Option<&str>,
) -> Result<Vec<AnalysisRecord>, FirebaseError> {
    let raw = fetch_history_raw(client, uid, Some(limit), auth).await?;
    let mut records: Vec<AnalysisRecord> = decode_children(&raw, "analysis_history");
    records.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
    records.truncate(limit);
    Ok(records)
}

/// Returns the stored profile, creating it on first access.
///
/// # Errors
///
/// Returns [`FirebaseError`] if the read or the create fails, or if the
/// stored profile does not decode.
pub async fn get_or_create_profile(
    client: &FirebaseClient,
    uid: &str,
    email: Option<&str>,
    display_name: Option<&str>,
    auth: Option<&str>,
) -> Result<UserProfile, FirebaseError> {
    let node = client.child(&user_path(uid, "profile"));
    let existing = node.get(auth).await?;
    if !existing.is_null() {
        return serde_json::from_value(existing).map_err(|e| FirebaseError::Deserialize {
            context: format!("profile({uid})"),
            source: e,
        });
    }

    let profile = UserProfile {
        uid: uid.to_string(),
        email: email.map(str::to_string),
        display_name: display_name.map(str::to_string),
        created_at: Utc::now().to_rfc3339(),
        total_analyses: 0,
        total_vehicles: 0,
    };
    node.set(&profile, auth).await?;
    tracing::info!(uid, "created user profile");
    Ok(profile)
}

/// Read-modify-write increment of a profile counter. Not atomic: concurrent
/// increments can be lost. Returns the new value.
///
/// # Errors
///
/// Returns [`FirebaseError`] if the read or the write fails.
pub async fn increment_profile_counter(
    client: &FirebaseClient,
    uid: &str,
    counter: ProfileCounter,
    auth: Option<&str>,
) -> Result<u64, FirebaseError> {
    let node = client
        .child(&user_path(uid, "profile"))
        .child(counter.field());
    let current = node.get(auth).await?.as_u64().unwrap_or(0);
    let next = current + 1;
    node.set(&next, auth).await?;
    Ok(next)
}

/// Keys under `/users`, fetched with `shallow=true`, sorted.
///
/// # Errors
///
/// Returns [`FirebaseError`] if the read fails.
pub async fn list_user_ids(
    client: &FirebaseClient,
    auth: Option<&str>,
) -> Result<Vec<String>, FirebaseError> {
    let query = Query {
        shallow: true,
        timeout: Some(client.list_timeout()),
        ..Query::default()
    };
    let value = client.child("users").get_with(&query, auth).await?;
    let mut uids: Vec<String> = value
        .as_object()
        .map(|m| m.keys().cloned().collect())
        .unwrap_or_default();
    uids.sort();
    Ok(uids)
}

/// Stores a vehicle under a fresh id and returns it.
///
/// # Errors
///
/// Returns [`FirebaseError`] if the write fails.
pub async fn save_vehicle(
    client: &FirebaseClient,
    uid: &str,
    input: NewVehicle,
    auth: Option<&str>,
) -> Result<Vehicle, FirebaseError> {
    let vehicle = Vehicle {
        id: Uuid::new_v4().to_string(),
        make: input.make,
        model: input.model,
        year: input.year,
        registration_number: input.registration_number,
        added_at: Utc::now().to_rfc3339(),
    };
    client
        .child(&user_path(uid, "vehicles"))
        .child(&vehicle.id)
        .set(&vehicle, auth)
        .await?;
    tracing::info!(uid, vehicle_id = %vehicle.id, "saved vehicle");
    Ok(vehicle)
}

/// All vehicles for a user, oldest first.
///
/// # Errors
///
/// Returns [`FirebaseError`] if the read fails.
pub async fn list_vehicles(
    client: &FirebaseClient,
    uid: &str,
    auth: Option<&str>,
) -> Result<Vec<Vehicle>, FirebaseError> {
    let query = Query {
        timeout: Some(client.list_timeout()),
        ..Query::default()
    };
    let raw = client
        .child(&user_path(uid, "vehicles"))
        .get_with(&query, auth)
        .await?;
    let mut vehicles: Vec<Vehicle> = decode_children(&raw, "vehicles");
    vehicles.sort_by(|a, b| a.added_at.cmp(&b.added_at));
    Ok(vehicles)
}

/// Decodes the children of an object (or sparse array) node, skipping
/// entries that do not match `T`.
fn decode_children<T: DeserializeOwned>(node: &Value, what: &str) -> Vec<T> {
    let children: Vec<&Value> = match node {
        Value::Object(map) => map.values().collect(),
        Value::Array(items) => items.iter().filter(|v| !v.is_null()).collect(),
        _ => Vec::new(),
    };
    children
        .into_iter()
        .filter_map(|child| match serde_json::from_value::<T>(child.clone()) {
            Ok(item) => Some(item),
            Err(e) => {
                tracing::warn!(node = what, error = %e, "skipping undecodable entry");
                None
            }
        })
        .collect()
}
