// src/handlers/batches.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::i18n::Locale,
    models::batch::{BatchRow, CreateBatchPayload, CreatedBatch, ProductionBatch, UpdateBatchPayload},
};

// ---
// Handler: create_batch
// ---
#[utoipa::path(
    post,
    path = "/api/batches",
    tag = "Batches",
    request_body = CreateBatchPayload,
    responses(
        (status = 201, description = "Batch recorded and QR generated", body = CreatedBatch),
        (status = 400, description = "Invalid fields"),
        (status = 409, description = "Batch ID already exists")
    ),
    security(("operator_token" = []))
)]
pub async fn create_batch(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<CreateBatchPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let payload = payload.normalized();

    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    payload.validate_consistency().map_err(|e| {
        let mut errors = validator::ValidationErrors::new();
        errors.add("expiryDate", e);
        AppError::ValidationError(errors).to_api_error(&locale)
    })?;

    let batch = app_state
        .batch_service
        .create(payload.into_new_batch())
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    let created = CreatedBatch {
        consumer_url: app_state.qr_service.payload_for(&batch.batch_id),
        qr_url: format!("/api/batches/{}/qr", batch.batch_id),
        batch,
    };
    Ok((StatusCode::CREATED, Json(created)))
}

// ---
// Handler: list_batches
// ---
#[utoipa::path(
    get,
    path = "/api/batches",
    tag = "Batches",
    responses(
        (status = 200, description = "All batches, newest first, with expiry status", body = Vec<BatchRow>)
    ),
    security(("operator_token" = []))
)]
pub async fn list_batches(
    State(app_state): State<AppState>,
    locale: Locale,
) -> Result<impl IntoResponse, ApiError> {
    let rows = app_state
        .batch_service
        .list_rows(&locale)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(rows)))
}

#[utoipa::path(
    get,
    path = "/api/batches/{batch_id}",
    tag = "Batches",
    params(("batch_id" = String, Path, description = "Batch ID")),
    responses(
        (status = 200, description = "Batch record", body = ProductionBatch),
        (status = 404, description = "Unknown batch")
    ),
    security(("operator_token" = []))
)]
pub async fn get_batch(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(batch_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let batch = app_state
        .batch_service
        .get(&batch_id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(batch)))
}

// ---
// Handler: update_batch (site, variant, warehouse, expiry)
// ---
#[utoipa::path(
    patch,
    path = "/api/batches/{batch_id}",
    tag = "Batches",
    request_body = UpdateBatchPayload,
    params(("batch_id" = String, Path, description = "Batch ID")),
    responses(
        (status = 200, description = "Updated batch", body = ProductionBatch),
        (status = 400, description = "Invalid or empty change set"),
        (status = 404, description = "Unknown batch")
    ),
    security(("operator_token" = []))
)]
pub async fn update_batch(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(batch_id): Path<String>,
    Json(payload): Json<UpdateBatchPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let payload = payload.normalized();

    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let changes = payload.into_changes();
    if changes.is_empty() {
        let mut err = validator::ValidationError::new("NoChanges");
        err.message = Some("At least one field must be provided.".into());
        let mut errors = validator::ValidationErrors::new();
        errors.add("body", err);
        return Err(AppError::ValidationError(errors).to_api_error(&locale));
    }

    let updated = app_state
        .batch_service
        .update(&batch_id, changes)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(updated)))
}

#[utoipa::path(
    delete,
    path = "/api/batches/{batch_id}",
    tag = "Batches",
    params(("batch_id" = String, Path, description = "Batch ID")),
    responses(
        (status = 204, description = "Batch and its QR file removed"),
        (status = 404, description = "Unknown batch")
    ),
    security(("operator_token" = []))
)]
pub async fn delete_batch(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(batch_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .batch_service
        .delete(&batch_id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(StatusCode::NO_CONTENT)
}
