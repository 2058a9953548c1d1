use serde_json::Value;

use crate::client::{DbRef, Query};
use crate::error::FirebaseError;

/// Child keys tried in order for server-side ordering of history nodes.
pub const ORDER_KEYS: [&str; 2] = ["uploadedAt", "timestamp"];

/// Reads a list node ordered by [`ORDER_KEYS`], falling back to the next key
/// and finally to an unordered read when the server rejects the query
/// (HTTP 400, typically a missing `.indexOn` rule).
///
/// `limit` is sent as `limitToLast` on ordered reads only; the unordered
/// read returns everything and callers trim it. All attempts use the
/// client's list timeout.
///
/// # Errors
///
/// Returns the first error that is not a 400, or the unordered read's error.
pub async fn get_ordered_with_fallback(
    node: &DbRef<'_>,
    list_timeout: std::time::Duration,
    limit: Option<usize>,
    auth: Option<&str>,
) -> Result<Value, FirebaseError> {
    for key in ORDER_KEYS {
        let query = Query {
            order_by: Some(key.to_string()),
            limit_to_last: limit,
            shallow: false,
            timeout: Some(list_timeout),
        };
        match node.get_with(&query, auth).await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_bad_request() => {
                tracing::debug!(path = %node.path(), order_by = key, error = %e, "ordered read rejected; trying next ordering");
            }
            Err(e) => return Err(e),
        }
    }

    let query = Query {
        timeout: Some(list_timeout),
        ..Query::default()
    };
    node.get_with(&query, auth).await
}
