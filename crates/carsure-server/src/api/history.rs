use axum::{
    extract::{Query, State},
    Extension, Json,
};
use carsure_core::AnalysisRecord;
use carsure_firebase::list_analysis_history;
use serde::Deserialize;

use crate::middleware::{AuthUser, RequestId};

use super::{map_firebase_error, normalize_limit, ApiError, ApiResponse, AppState};

const DEFAULT_HISTORY_LIMIT: usize = 50;
const MAX_HISTORY_LIMIT: usize = 200;

#[derive(Debug, Deserialize)]
pub(super) struct HistoryQuery {
    pub limit: Option<usize>,
}

/// Newest-first analysis history of the caller.
pub(super) async fn list_history(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<ApiResponse<Vec<AnalysisRecord>>>, ApiError> {
    let limit = normalize_limit(query.limit, DEFAULT_HISTORY_LIMIT, MAX_HISTORY_LIMIT);
    let records = list_analysis_history(&state.firebase, &user.uid, limit, user.token.as_deref())
        .await
        .map_err(|e| map_firebase_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse::new(req_id.0, records)))
}
