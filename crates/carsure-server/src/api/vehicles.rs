use axum::{extract::State, http::StatusCode, Extension, Json};
use carsure_core::Vehicle;
use carsure_firebase::{increment_profile_counter, save_vehicle, NewVehicle, ProfileCounter};

use crate::middleware::{AuthUser, RequestId};

use super::{map_firebase_error, ApiError, ApiResponse, AppState};

fn validate_vehicle(req_id: &str, input: &NewVehicle) -> Result<(), ApiError> {
    for (field, value) in [
        ("make", &input.make),
        ("model", &input.model),
        ("year", &input.year),
    ] {
        if value.trim().is_empty() {
            return Err(ApiError::new(
                req_id,
                "validation_error",
                format!("'{field}' is required"),
            ));
        }
    }
    Ok(())
}

pub(super) async fn list_vehicles(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<ApiResponse<Vec<Vehicle>>>, ApiError> {
    let vehicles = carsure_firebase::list_vehicles(&state.firebase, &user.uid, user.token.as_deref())
        .await
        .map_err(|e| map_firebase_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse::new(req_id.0, vehicles)))
}

pub(super) async fn create_vehicle(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(user): Extension<AuthUser>,
    Json(input): Json<NewVehicle>,
) -> Result<(StatusCode, Json<ApiResponse<Vehicle>>), ApiError> {
    validate_vehicle(&req_id.0, &input)?;

    let auth = user.token.as_deref();
    let vehicle = save_vehicle(&state.firebase, &user.uid, input, auth)
        .await
        .map_err(|e| map_firebase_error(req_id.0.clone(), &e))?;

    if let Err(e) =
        increment_profile_counter(&state.firebase, &user.uid, ProfileCounter::TotalVehicles, auth).await
    {
        tracing::warn!(uid = %user.uid, error = %e, "failed to bump vehicle counter");
    }

    Ok((StatusCode::CREATED, Json(ApiResponse::new(req_id.0, vehicle))))
}
