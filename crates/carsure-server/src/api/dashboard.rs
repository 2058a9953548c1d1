//! Dashboard routes. Both always answer 200: a failed read degrades to the
//! empty dashboard with `dataSource: "empty"`.

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use carsure_core::{process_dashboard_data, DashboardData, UsersData};
use carsure_firebase::{fetch_all_users_data, fetch_history_raw};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::middleware::{AuthUser, RequestId};

use super::{normalize_limit, ApiResponse, AppState};

const DEFAULT_RECENT_LIMIT: usize = 10;
const MAX_RECENT_LIMIT: usize = 100;
const DEFAULT_MAX_USERS: usize = 100;
const MAX_MAX_USERS: usize = 1000;
const USER_HISTORY_LIMIT: usize = 200;
const PER_USER_HISTORY_LIMIT: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub(super) enum DataSource {
    Firebase,
    Empty,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct DashboardResponse {
    #[serde(flatten)]
    dashboard: DashboardData,
    data_source: DataSource,
}

impl DashboardResponse {
    fn empty() -> Self {
        Self {
            dashboard: DashboardData::empty(),
            data_source: DataSource::Empty,
        }
    }

    fn from_users(users: &UsersData, recent_limit: usize) -> Self {
        if users.is_empty() {
            return Self::empty();
        }
        Self {
            dashboard: process_dashboard_data(users, recent_limit),
            data_source: DataSource::Firebase,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct UserDashboardQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub(super) struct AggregatedDashboardQuery {
    pub max_users: Option<usize>,
    pub limit: Option<usize>,
}

/// Statistics over the caller's own history.
pub(super) async fn user_dashboard(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<UserDashboardQuery>,
) -> Json<ApiResponse<DashboardResponse>> {
    let recent_limit = normalize_limit(query.limit, DEFAULT_RECENT_LIMIT, MAX_RECENT_LIMIT);

    let body = match fetch_history_raw(
        &state.firebase,
        &user.uid,
        Some(USER_HISTORY_LIMIT),
        user.token.as_deref(),
    )
    .await
    {
        Ok(history) if history.is_null() => DashboardResponse::empty(),
        Ok(history) => {
            let users = UsersData::from([(user.uid.clone(), json!({ "analysis_history": history }))]);
            DashboardResponse::from_users(&users, recent_limit)
        }
        Err(e) => {
            tracing::warn!(uid = %user.uid, error = %e, "user dashboard fetch failed; serving empty");
            DashboardResponse::empty()
        }
    };

    Json(ApiResponse::new(req_id.0, body))
}

/// Statistics across up to `max_users` users. Admin only.
pub(super) async fn aggregated_dashboard(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<AggregatedDashboardQuery>,
) -> Json<ApiResponse<DashboardResponse>> {
    let max_users = normalize_limit(query.max_users, DEFAULT_MAX_USERS, MAX_MAX_USERS);
    let recent_limit = normalize_limit(query.limit, DEFAULT_RECENT_LIMIT, MAX_RECENT_LIMIT);

    let body = match fetch_all_users_data(
        &state.firebase,
        max_users,
        PER_USER_HISTORY_LIMIT,
        user.token.as_deref(),
    )
    .await
    {
        Ok(users) => {
            tracing::info!(users = users.len(), max_users, "aggregating dashboard");
            DashboardResponse::from_users(&users, recent_limit)
        }
        Err(e) => {
            tracing::warn!(error = %e, "aggregated dashboard fetch failed; serving empty");
            DashboardResponse::empty()
        }
    };

    Json(ApiResponse::new(req_id.0, body))
}
