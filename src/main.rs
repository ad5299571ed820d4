// src/main.rs

use axum::{
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod services;

#[cfg(test)]
mod test_support;

use crate::common::db_utils;
use crate::config::{AppConfig, AppState};
use crate::docs::ApiDoc;
use crate::middleware::auth::operator_guard;

// Phone photos are larger than axum's 2 MB default
const SCAN_BODY_LIMIT: usize = 16 * 1024 * 1024;

fn build_router(app_state: AppState) -> Router {
    // Public: the page behind the printed QR code
    let public_routes = Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/consumer", get(handlers::consumer::consumer_view));

    let batch_routes = Router::new()
        .route(
            "/",
            post(handlers::batches::create_batch).get(handlers::batches::list_batches),
        )
        .route("/export.csv", get(handlers::documents::export_csv))
        .route(
            "/{batch_id}",
            get(handlers::batches::get_batch)
                .patch(handlers::batches::update_batch)
                .delete(handlers::batches::delete_batch),
        )
        .route("/{batch_id}/qr", get(handlers::documents::qr_png))
        .route("/{batch_id}/pdf", get(handlers::documents::batch_pdf));

    let scan_routes = Router::new()
        .route("/", post(handlers::scan::scan_image))
        .route("/frame", post(handlers::scan::scan_frame))
        .route("/latest", get(handlers::scan::latest_scan))
        .layer(DefaultBodyLimit::max(SCAN_BODY_LIMIT));

    let backup_routes = Router::new()
        .route(
            "/",
            get(handlers::backups::list_backups).post(handlers::backups::backup_now),
        )
        .route("/{filename}/restore", post(handlers::backups::restore_backup));

    let operator_routes = Router::new()
        .nest("/batches", batch_routes)
        .nest("/scan", scan_routes)
        .nest("/backups", backup_routes)
        .route("/activity", get(handlers::activity::list_activity))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            operator_guard,
        ));

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .nest("/api", public_routes.merge(operator_routes))
        .with_state(app_state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    // A bad configuration stops startup
    let config = AppConfig::from_env()?;
    let bind_addr = config.bind_addr.clone();
    let app_state = AppState::new(config).await?;

    db_utils::run_migrations(&app_state.db_pool).await?;

    let app = build_router(app_state);

    let listener = TcpListener::bind(&bind_addr).await?;
    tracing::info!("🚀 Listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
