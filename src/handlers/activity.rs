// src/handlers/activity.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

use crate::{
    common::error::ApiError,
    config::AppState,
    middleware::i18n::Locale,
    models::activity::ActivityLogEntry,
};

#[utoipa::path(
    get,
    path = "/api/activity",
    tag = "Activity",
    responses(
        (status = 200, description = "Activity log, newest first", body = Vec<ActivityLogEntry>)
    ),
    security(("operator_token" = []))
)]
pub async fn list_activity(
    State(app_state): State<AppState>,
    locale: Locale,
) -> Result<impl IntoResponse, ApiError> {
    let entries = app_state
        .batch_service
        .activity_log()
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(entries)))
}
