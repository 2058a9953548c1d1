use axum::{extract::State, Extension, Json};
use carsure_core::UserProfile;
use carsure_firebase::get_or_create_profile;

use crate::middleware::{AuthUser, RequestId};

use super::{map_firebase_error, ApiError, ApiResponse, AppState};

pub(super) async fn get_profile(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<ApiResponse<UserProfile>>, ApiError> {
    let profile = get_or_create_profile(
        &state.firebase,
        &user.uid,
        user.email.as_deref(),
        user.display_name.as_deref(),
        user.token.as_deref(),
    )
    .await
    .map_err(|e| map_firebase_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse::new(req_id.0, profile)))
}
