// src/handlers/documents.rs

use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
};

use crate::{
    common::error::ApiError,
    config::AppState,
    middleware::i18n::Locale,
};

#[utoipa::path(
    get,
    path = "/api/batches/{batch_id}/qr",
    tag = "Documents",
    params(("batch_id" = String, Path, description = "Batch ID")),
    responses(
        (status = 200, description = "QR code PNG"),
        (status = 404, description = "Unknown batch")
    ),
    security(("operator_token" = []))
)]
pub async fn qr_png(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(batch_id): Path<String>,
) -> Result<Response, ApiError> {
    let batch = app_state
        .batch_service
        .get(&batch_id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    let png = app_state
        .qr_service
        .read_or_generate(&batch.batch_id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    let headers = [
        (header::CONTENT_TYPE, "image/png".to_string()),
        (header::CONTENT_DISPOSITION, format!("inline; filename=\"{}.png\"", batch.batch_id)),
    ];
    Ok((headers, png).into_response())
}

#[utoipa::path(
    get,
    path = "/api/batches/{batch_id}/pdf",
    tag = "Documents",
    params(("batch_id" = String, Path, description = "Batch ID")),
    responses(
        (status = 200, description = "Single-page product report"),
        (status = 404, description = "Unknown batch")
    ),
    security(("operator_token" = []))
)]
pub async fn batch_pdf(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(batch_id): Path<String>,
) -> Result<Response, ApiError> {
    let batch = app_state
        .batch_service
        .get(&batch_id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;
    let filename = format!("{}.pdf", batch.batch_id);

    let pdf_bytes = app_state
        .document_service
        .generate_batch_pdf(batch, locale.clone())
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    // Download prompt in the browser
    let headers = [
        (header::CONTENT_TYPE, "application/pdf".to_string()),
        (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", filename)),
    ];
    Ok((headers, pdf_bytes).into_response())
}

#[utoipa::path(
    get,
    path = "/api/batches/export.csv",
    tag = "Documents",
    responses(
        (status = 200, description = "Whole table as CSV, header row first")
    ),
    security(("operator_token" = []))
)]
pub async fn export_csv(
    State(app_state): State<AppState>,
    locale: Locale,
) -> Result<Response, ApiError> {
    let (csv, _rows) = app_state
        .backup_service
        .export_csv()
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    let headers = [
        (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
        (header::CONTENT_DISPOSITION, "attachment; filename=\"production_batches.csv\""),
    ];
    Ok((headers, csv).into_response())
}
