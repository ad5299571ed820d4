// src/middleware/auth.rs

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::i18n::Locale,
};

/// Guards the operator routes. With no `OPERATOR_TOKEN` configured every request passes.
pub async fn operator_guard(
    State(app_state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(expected) = app_state.config.operator_token.as_deref() else {
        return Ok(next.run(request).await);
    };

    let provided = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim);

    if provided == Some(expected) {
        return Ok(next.run(request).await);
    }

    let locale = Locale::from_header(
        request
            .headers()
            .get(header::ACCEPT_LANGUAGE)
            .and_then(|value| value.to_str().ok()),
    );
    tracing::warn!("Rejected operator request to {}", request.uri().path());
    Err(AppError::InvalidToken.to_api_error(&locale))
}
