//! `POST /api/auth/verify`. The token itself is checked by `require_auth`;
//! reaching the handler means it was valid.

use axum::{extract::State, Extension, Json};
use carsure_firebase::get_or_create_profile;
use serde::Serialize;

use crate::middleware::{AuthUser, RequestId};

use super::{ApiResponse, AppState};

#[derive(Debug, Serialize)]
pub(super) struct VerifiedUserBody {
    uid: String,
    email: Option<String>,
    display_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct VerifyResponse {
    valid: bool,
    user: VerifiedUserBody,
}

pub(super) async fn verify(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(user): Extension<AuthUser>,
) -> Json<ApiResponse<VerifyResponse>> {
    // First sign-in creates the profile; a failure here does not invalidate the token.
    if let Err(e) = get_or_create_profile(
        &state.firebase,
        &user.uid,
        user.email.as_deref(),
        user.display_name.as_deref(),
        user.token.as_deref(),
    )
    .await
    {
        tracing::warn!(uid = %user.uid, error = %e, "could not ensure user profile");
    }

    Json(ApiResponse::new(
        req_id.0,
        VerifyResponse {
            valid: true,
            user: VerifiedUserBody {
                uid: user.uid,
                email: user.email,
                display_name: user.display_name,
            },
        },
    ))
}
