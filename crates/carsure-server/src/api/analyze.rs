//! `POST /api/analyze-damage`: multipart upload → assessment → history record.

use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    Extension, Json,
};
use base64::{engine::general_purpose, Engine};
use carsure_assess::{image_fingerprint, AssessError};
use carsure_core::{AnalysisRecord, StructuredDamageResult};
use carsure_firebase::{increment_profile_counter, save_analysis, ProfileCounter};
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::middleware::{AuthUser, RequestId};

use super::{ApiError, ApiResponse, AppState};

const IMAGE_FIELD: &str = "image";

#[derive(Debug, Serialize)]
pub(super) struct AnalyzeResponse {
    raw_analysis: String,
    structured_data: StructuredDamageResult,
    /// `None` when the record could not be stored; the assessment is still
    /// returned.
    record_id: Option<String>,
    demo_mode: bool,
}

struct Upload {
    filename: String,
    bytes: Vec<u8>,
}

fn multipart_error(request_id: &str, error: &MultipartError) -> ApiError {
    if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return ApiError::new(request_id, "payload_too_large", "image exceeds upload limit");
    }
    ApiError::new(request_id, "validation_error", "malformed multipart body")
        .with_details(error.body_text())
}

async fn read_image_field(request_id: &str, multipart: &mut Multipart) -> Result<Upload, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(request_id, &e))?
    {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().trim().to_string();
        if filename.is_empty() {
            return Err(ApiError::new(request_id, "validation_error", "no file selected"));
        }
        let bytes = field
            .bytes()
            .await
            .map_err(|e| multipart_error(request_id, &e))?;
        if bytes.is_empty() {
            return Err(ApiError::new(request_id, "validation_error", "uploaded file is empty"));
        }
        return Ok(Upload {
            filename,
            bytes: bytes.to_vec(),
        });
    }
    Err(ApiError::new(
        request_id,
        "validation_error",
        "no image file provided",
    ))
}

pub(super) async fn analyze_damage(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(user): Extension<AuthUser>,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<AnalyzeResponse>>, ApiError> {
    let upload = read_image_field(&req_id.0, &mut multipart).await?;

    let outcome = match state.pipeline.analyze(&upload.bytes, &upload.filename).await {
        Ok(outcome) => outcome,
        Err(AssessError::EmptyImage) => {
            return Err(ApiError::new(
                req_id.0,
                "validation_error",
                "uploaded file is empty",
            ));
        }
        Err(AssessError::Provider(e)) => {
            return Err(
                ApiError::new(req_id.0, "internal_error", "damage analysis failed")
                    .with_details(e.to_string()),
            );
        }
    };

    let demo_mode = outcome.structured.demo_mode;
    let record = AnalysisRecord {
        id: Uuid::new_v4().to_string(),
        user_id: user.uid.clone(),
        uploaded_at: Utc::now().to_rfc3339(),
        filename: upload.filename,
        image_hash: image_fingerprint(&upload.bytes),
        image_data: state
            .config
            .store_raw_image
            .then(|| general_purpose::STANDARD.encode(&upload.bytes)),
        structured_data: outcome.structured,
        raw_analysis: outcome.raw_analysis,
        demo_mode,
    };

    let auth = user.token.as_deref();
    let record_id = match save_analysis(&state.firebase, &record, auth).await {
        Ok(()) => {
            if let Err(e) =
                increment_profile_counter(&state.firebase, &user.uid, ProfileCounter::TotalAnalyses, auth)
                    .await
            {
                tracing::warn!(uid = %user.uid, error = %e, "failed to bump analysis counter");
            }
            Some(record.id)
        }
        Err(e) => {
            tracing::error!(uid = %user.uid, error = %e, "failed to store analysis record");
            None
        }
    };

    Ok(Json(ApiResponse::new(
        req_id.0,
        AnalyzeResponse {
            raw_analysis: record.raw_analysis,
            structured_data: record.structured_data,
            record_id,
            demo_mode,
        },
    )))
}
