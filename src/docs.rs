// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;
use crate::services;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Batches ---
        handlers::batches::create_batch,
        handlers::batches::list_batches,
        handlers::batches::get_batch,
        handlers::batches::update_batch,
        handlers::batches::delete_batch,

        // --- Documents ---
        handlers::documents::qr_png,
        handlers::documents::batch_pdf,
        handlers::documents::export_csv,

        // --- Consumer ---
        handlers::consumer::consumer_view,

        // --- Scan ---
        handlers::scan::scan_image,
        handlers::scan::scan_frame,
        handlers::scan::latest_scan,

        // --- Activity ---
        handlers::activity::list_activity,

        // --- Backups ---
        handlers::backups::list_backups,
        handlers::backups::backup_now,
        handlers::backups::restore_backup,
    ),
    components(
        schemas(
            // --- Batches ---
            models::batch::ProductionBatch,
            models::batch::CreateBatchPayload,
            models::batch::UpdateBatchPayload,
            models::batch::BatchRow,
            models::batch::CreatedBatch,
            services::expiry::ExpiryStatus,

            // --- Consumer / Scan ---
            models::batch::ConsumerView,
            models::batch::ConsumerPlaceholder,
            models::batch::ScanResult,
            models::batch::LatestScanResponse,

            // --- Activity ---
            models::activity::ActivityLogEntry,

            // --- Backups ---
            models::backup::BackupList,
            models::backup::BackupResult,
            models::backup::BackupRequest,
        )
    ),
    tags(
        (name = "Batches", description = "Production batch records"),
        (name = "Documents", description = "QR image, PDF report and CSV export"),
        (name = "Consumer", description = "Public product page behind the QR link"),
        (name = "Scan", description = "QR decoding from uploads and camera frames"),
        (name = "Activity", description = "Append-only activity log"),
        (name = "Backups", description = "CSV snapshots in the remote repository")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "operator_token",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}
