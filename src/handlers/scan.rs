// src/handlers/scan.rs

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::i18n::Locale,
    models::batch::{LatestScanResponse, ScanResult},
    services::qr_service,
};

async fn decode_upload(bytes: Bytes) -> Result<Option<String>, AppError> {
    tokio::task::spawn_blocking(move || qr_service::decode(&bytes))
        .await
        .map_err(|e| anyhow::anyhow!("QR decode task failed: {}", e))?
}

// ---
// Handler: scan_image (uploaded photo of a label)
// ---
#[utoipa::path(
    post,
    path = "/api/scan",
    tag = "Scan",
    request_body(content = Vec<u8>, content_type = "application/octet-stream", description = "PNG or JPEG image"),
    responses(
        (status = 200, description = "Decoded payload and the batch it points to", body = ScanResult),
        (status = 404, description = "Payload names an unknown batch"),
        (status = 422, description = "No readable QR, or a QR without a batch id")
    ),
    security(("operator_token" = []))
)]
pub async fn scan_image(
    State(app_state): State<AppState>,
    locale: Locale,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let payload = decode_upload(body)
        .await
        .and_then(|decoded| decoded.ok_or(AppError::QrUnreadable))
        .map_err(|e| e.to_api_error(&locale))?;

    let batch_id = qr_service::extract_batch_id(&payload)
        .ok_or_else(|| AppError::ForeignQrPayload.to_api_error(&locale))?;

    let batch = app_state
        .batch_service
        .consumer_view(&batch_id, &locale)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    tracing::info!("🔎 Scanned batch {}", batch_id);
    Ok((StatusCode::OK, Json(ScanResult { payload, batch_id, batch })))
}

// ---
// Camera polling: frames in, latest decoded payload out
// ---
#[utoipa::path(
    post,
    path = "/api/scan/frame",
    tag = "Scan",
    request_body(content = Vec<u8>, content_type = "application/octet-stream", description = "One camera frame"),
    responses(
        (status = 200, description = "Latest payload after this frame", body = LatestScanResponse),
        (status = 422, description = "Frame is not a decodable image")
    ),
    security(("operator_token" = []))
)]
pub async fn scan_frame(
    State(app_state): State<AppState>,
    locale: Locale,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let decoded = decode_upload(body).await.map_err(|e| e.to_api_error(&locale))?;

    let mut latest = app_state.latest_scan.write().await;
    if let Some(payload) = decoded {
        *latest = Some(payload);
    }
    let response = latest_response(latest.clone());
    Ok((StatusCode::OK, Json(response)))
}

#[utoipa::path(
    get,
    path = "/api/scan/latest",
    tag = "Scan",
    responses(
        (status = 200, description = "Most recent payload seen by the camera, if any", body = LatestScanResponse)
    ),
    security(("operator_token" = []))
)]
pub async fn latest_scan(State(app_state): State<AppState>) -> impl IntoResponse {
    let latest = app_state.latest_scan.read().await.clone();
    Json(latest_response(latest))
}

fn latest_response(payload: Option<String>) -> LatestScanResponse {
    let batch_id = payload.as_deref().and_then(qr_service::extract_batch_id);
    LatestScanResponse { payload, batch_id }
}
