// src/handlers/backups.rs

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::{
    common::error::ApiError,
    config::AppState,
    middleware::i18n::Locale,
    models::backup::{BackupList, BackupRequest, BackupResult},
};

#[utoipa::path(
    get,
    path = "/api/backups",
    tag = "Backups",
    responses(
        (status = 200, description = "Remote CSV snapshots, newest first", body = BackupList),
        (status = 502, description = "Remote API failed"),
        (status = 503, description = "Backup not configured")
    ),
    security(("operator_token" = []))
)]
pub async fn list_backups(
    State(app_state): State<AppState>,
    locale: Locale,
) -> Result<impl IntoResponse, ApiError> {
    let files = app_state
        .backup_service
        .list_backups()
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(BackupList { files })))
}

// The body is optional: an empty request uses the default commit message.
#[utoipa::path(
    post,
    path = "/api/backups",
    tag = "Backups",
    request_body(content = BackupRequest, description = "Optional commit message"),
    responses(
        (status = 201, description = "Snapshot uploaded", body = BackupResult),
        (status = 502, description = "Remote API failed"),
        (status = 503, description = "Backup not configured")
    ),
    security(("operator_token" = []))
)]
pub async fn backup_now(
    State(app_state): State<AppState>,
    locale: Locale,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        BackupRequest::default()
    } else {
        serde_json::from_slice::<BackupRequest>(&body)
            .map_err(|e| ApiError::new(StatusCode::BAD_REQUEST, e.to_string()))?
    };

    let message = request.message.as_deref().map(str::trim).filter(|m| !m.is_empty());
    let result = app_state
        .backup_service
        .backup_now(message)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::CREATED, Json(result)))
}

#[utoipa::path(
    post,
    path = "/api/backups/{filename}/restore",
    tag = "Backups",
    params(("filename" = String, Path, description = "Remote file name, e.g. backup_20251110_0915.csv")),
    responses(
        (status = 200, description = "Table replaced by the snapshot", body = BackupResult),
        (status = 404, description = "No such remote file"),
        (status = 422, description = "File is not a valid snapshot")
    ),
    security(("operator_token" = []))
)]
pub async fn restore_backup(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(filename): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let result = app_state
        .backup_service
        .restore(&filename)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(result)))
}
