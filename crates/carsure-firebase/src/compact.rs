use carsure_core::UsersData;
use futures::stream::{self, StreamExt};
use serde_json::{json, Value};

use crate::client::FirebaseClient;
use crate::error::FirebaseError;
use crate::repository::{fetch_history_raw, list_user_ids};

/// Upper bound on concurrent per-user history reads.
pub const MAX_CONCURRENT_USER_FETCHES: usize = 8;

/// Fetches each user's recent history concurrently and shapes it as
/// `uid -> {"analysis_history": {...}}` for the dashboard aggregator.
///
/// Concurrency is `min(8, uids.len())`. An empty `uids` returns an empty map
/// without any request. A user whose fetch fails is logged and left out.
pub async fn build_compact_users_data(
    client: &FirebaseClient,
    uids: &[String],
    per_user_limit: usize,
    auth: Option<&str>,
) -> UsersData {
    if uids.is_empty() {
        return UsersData::new();
    }
    let concurrency = uids.len().min(MAX_CONCURRENT_USER_FETCHES);

    let results: Vec<(String, Result<Value, FirebaseError>)> = stream::iter(uids.iter().cloned())
        .map(|uid| async move {
            let result = fetch_history_raw(client, &uid, Some(per_user_limit), auth).await;
            (uid, result)
        })
        .buffer_unordered(concurrency)
        .collect()
        .await;

    let mut users = UsersData::new();
    for (uid, result) in results {
        match result {
            Ok(history) => {
                let history = if history.is_null() { json!({}) } else { history };
                users.insert(uid, json!({ "analysis_history": history }));
            }
            Err(e) => {
                tracing::warn!(uid = %uid, error = %e, "skipping user; history fetch failed");
            }
        }
    }
    tracing::debug!(requested = uids.len(), fetched = users.len(), "built compact users data");
    users
}

/// Lists up to `max_users` user ids and fetches their compact history.
///
/// # Errors
///
/// Returns [`FirebaseError`] only if the user list itself cannot be read;
/// per-user failures are skipped.
pub async fn fetch_all_users_data(
    client: &FirebaseClient,
    max_users: usize,
    per_user_limit: usize,
    auth: Option<&str>,
) -> Result<UsersData, FirebaseError> {
    let mut uids = list_user_ids(client, auth).await?;
    uids.truncate(max_users);
    Ok(build_compact_users_data(client, &uids, per_user_limit, auth).await)
}
