// src/handlers/consumer.rs

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    common::error::ApiError,
    config::AppState,
    middleware::i18n::Locale,
    models::batch::{ConsumerPlaceholder, ConsumerView},
};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ConsumerQuery {
    /// Batch ID carried by the QR link.
    pub batch_id: Option<String>,
}

// Public: this is the page the printed QR code points at.
#[utoipa::path(
    get,
    path = "/api/consumer",
    tag = "Consumer",
    params(ConsumerQuery),
    responses(
        (status = 200, description = "Product summary, or a scan prompt when no batch id is given", body = ConsumerView),
        (status = 404, description = "Unknown batch")
    )
)]
pub async fn consumer_view(
    State(app_state): State<AppState>,
    locale: Locale,
    Query(query): Query<ConsumerQuery>,
) -> Result<Response, ApiError> {
    let batch_id = query
        .batch_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty());

    let Some(batch_id) = batch_id else {
        let message = if locale.is_english() {
            "Scan the QR code on the package to see product information."
        } else {
            "Scan QR Code pada kemasan untuk melihat informasi produk."
        };
        return Ok(Json(ConsumerPlaceholder { message: message.to_string() }).into_response());
    };

    let view = app_state
        .batch_service
        .consumer_view(batch_id, &locale)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(view).into_response())
}
