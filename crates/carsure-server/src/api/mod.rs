mod analyze;
mod auth;
mod dashboard;
mod history;
mod profile;
mod vehicles;

use std::{sync::Arc, time::Duration};

use axum::{
    extract::{DefaultBodyLimit, State},
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use carsure_assess::AnalysisPipeline;
use carsure_core::AppConfig;
use carsure_firebase::{FirebaseClient, FirebaseError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use crate::middleware::{
    enforce_rate_limit, request_id, require_admin, require_auth, AuthState, RateLimitState,
    RequestId, DEV_BYPASS_HEADER,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub firebase: Arc<FirebaseClient>,
    pub pipeline: AnalysisPipeline,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    ai_provider: &'static str,
    detector_enabled: bool,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl<T: Serialize> ApiResponse<T> {
    pub(super) fn new(request_id: String, data: T) -> Self {
        Self {
            data,
            meta: ResponseMeta::new(request_id),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
                details: None,
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }

    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.error.details = Some(details.into());
        self
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "unauthorized" => StatusCode::UNAUTHORIZED,
            "forbidden" => StatusCode::FORBIDDEN,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "payload_too_large" => StatusCode::PAYLOAD_TOO_LARGE,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

pub(super) fn normalize_limit(limit: Option<usize>, default: usize, max: usize) -> usize {
    limit.unwrap_or(default).clamp(1, max)
}

pub(super) fn map_firebase_error(request_id: String, error: &FirebaseError) -> ApiError {
    tracing::error!(error = %error, "database request failed");
    ApiError::new(request_id, "internal_error", "database request failed")
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-request-id"),
            HeaderName::from_static(DEV_BYPASS_HEADER),
        ])
}

fn protected_router(
    auth: AuthState,
    rate_limit: RateLimitState,
    max_upload_bytes: usize,
) -> Router<AppState> {
    let admin_routes = Router::new()
        .route(
            "/api/admin/aggregated-dashboard-data",
            get(dashboard::aggregated_dashboard),
        )
        .layer(axum::middleware::from_fn_with_state(
            auth.clone(),
            require_admin,
        ));

    Router::new()
        .route(
            "/api/analyze-damage",
            post(analyze::analyze_damage).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/api/analysis/history", get(history::list_history))
        .route("/api/dashboard", get(dashboard::user_dashboard))
        .route("/api/auth/verify", post(auth::verify))
        .route("/api/profile", get(profile::get_profile))
        .route(
            "/api/vehicles",
            get(vehicles::list_vehicles).post(vehicles::create_vehicle),
        )
        .merge(admin_routes)
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn_with_state(
                    rate_limit,
                    enforce_rate_limit,
                ))
                .layer(axum::middleware::from_fn_with_state(auth, require_auth)),
        )
}

pub fn build_app(state: AppState, auth: AuthState, rate_limit: RateLimitState) -> Router {
    let public_routes = Router::new().route("/api/health", get(health));
    let max_upload_bytes = state.config.max_upload_bytes;

    Router::new()
        .merge(public_routes)
        .merge(protected_router(auth, rate_limit, max_upload_bytes))
        .layer(
            ServiceBuilder::new()
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    Json(ApiResponse::new(
        req_id.0,
        HealthData {
            status: "ok",
            ai_provider: state.pipeline.provider_name(),
            detector_enabled: state.config.detector_enabled,
        },
    ))
}

pub fn default_rate_limit_state() -> RateLimitState {
    RateLimitState::new(120, Duration::from_secs(60))
}

#[cfg(test)]
#[path = "api_test.rs"]
mod tests;
