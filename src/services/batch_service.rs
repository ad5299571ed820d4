// src/services/batch_service.rs

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::{
    common::{clock, error::AppError},
    config::AppConfig,
    db::{ActivityRepository, BatchRepository},
    middleware::i18n::Locale,
    models::{
        activity::ActivityLogEntry,
        batch::{
            check_expiry_after_production, normalize_batch_id, BatchChanges, BatchRow, ConsumerView, NewBatch,
            ProductionBatch, SortOrder,
        },
    },
    services::{expiry, qr_service::QrService},
};

#[derive(Clone)]
pub struct BatchService {
    pool: SqlitePool,
    batch_repo: BatchRepository,
    activity_repo: ActivityRepository,
    qr_service: QrService,
    config: Arc<AppConfig>,
}

impl BatchService {
    pub fn new(
        pool: SqlitePool,
        batch_repo: BatchRepository,
        activity_repo: ActivityRepository,
        qr_service: QrService,
        config: Arc<AppConfig>,
    ) -> Self {
        Self { pool, batch_repo, activity_repo, qr_service, config }
    }

    fn now(&self) -> String {
        clock::now_local(&self.config.utc_offset)
    }

    // --- CREATE ---
    pub async fn create(&self, batch: NewBatch) -> Result<ProductionBatch, AppError> {
        let now = self.now();
        let mut tx = self.pool.begin().await?;

        // 1. Uniqueness check; the insert below also maps a constraint hit to the same error
        if self.batch_repo.exists(&mut *tx, &batch.batch_id).await? {
            return Err(AppError::DuplicateBatchId(batch.batch_id));
        }

        // 2. Record + log line in one transaction
        let created = self.batch_repo.insert(&mut *tx, &batch, &now).await?;
        self.activity_repo
            .append(&mut *tx, &now, &format!("Tambah data batch {}", created.batch_id))
            .await?;

        tx.commit().await?;

        // 3. QR artifact. A failure here leaves the record; the PNG is rebuilt on first read.
        if let Err(e) = self.qr_service.generate(&created.batch_id).await {
            tracing::error!("QR generation failed for {}: {}", created.batch_id, e);
        }

        tracing::info!("📦 Batch {} created", created.batch_id);
        Ok(created)
    }

    // --- READ ---
    // Lookups take ids in any case, as typed by a person or read from a QR payload.
    pub async fn get(&self, batch_id: &str) -> Result<ProductionBatch, AppError> {
        let batch_id = normalize_batch_id(batch_id);
        self.batch_repo
            .find_by_batch_id(&batch_id)
            .await?
            .ok_or(AppError::BatchNotFound(batch_id))
    }

    // --- UPDATE (site / variant / warehouse / expiry only) ---
    pub async fn update(&self, batch_id: &str, changes: BatchChanges) -> Result<ProductionBatch, AppError> {
        let current = self.get(batch_id).await?;
        let batch_id = current.batch_id.as_str();

        if let Some(expiry_date) = changes.expiry_date {
            // Rows restored from old backups may hold an unparseable production date
            if let Some(production) = clock::parse_date(&current.production_date) {
                check_expiry_after_production(production, expiry_date).map_err(|e| {
                    let mut errors = validator::ValidationErrors::new();
                    errors.add("expiryDate", e);
                    AppError::ValidationError(errors)
                })?;
            }
        }

        let now = self.now();
        let mut tx = self.pool.begin().await?;

        let updated = self
            .batch_repo
            .update(&mut *tx, batch_id, &changes, &now)
            .await?
            .ok_or_else(|| AppError::BatchNotFound(batch_id.to_string()))?;
        self.activity_repo
            .append(&mut *tx, &now, &format!("Edit data batch {}", batch_id))
            .await?;

        tx.commit().await?;
        Ok(updated)
    }

    // --- DELETE (record + QR artifact) ---
    pub async fn delete(&self, batch_id: &str) -> Result<(), AppError> {
        let batch_id = &normalize_batch_id(batch_id);
        let now = self.now();
        let mut tx = self.pool.begin().await?;

        if !self.batch_repo.delete(&mut *tx, batch_id).await? {
            return Err(AppError::BatchNotFound(batch_id.to_string()));
        }
        self.activity_repo
            .append(&mut *tx, &now, &format!("Hapus data batch {}", batch_id))
            .await?;

        tx.commit().await?;

        self.qr_service.remove(batch_id).await;
        tracing::info!("🗑️ Batch {} deleted", batch_id);
        Ok(())
    }

    pub async fn list(&self, order: SortOrder) -> Result<Vec<ProductionBatch>, AppError> {
        self.batch_repo.list_all(order).await
    }

    /// Operator table: every record joined with its expiry label and QR thumbnail.
    pub async fn list_rows(&self, locale: &Locale) -> Result<Vec<BatchRow>, AppError> {
        let today = clock::today_local(&self.config.utc_offset);
        let batches = self.batch_repo.list_all(SortOrder::NewestFirst).await?;

        let mut rows = Vec::with_capacity(batches.len());
        for batch in batches {
            let classification =
                expiry::classify_text(&batch.expiry_date, today, self.config.near_expiry_days);
            let qr_thumbnail = self.qr_service.thumbnail_data_url(&batch.batch_id).await;
            rows.push(BatchRow {
                status: classification.status,
                status_label: classification.label(locale),
                days_until_expiry: classification.days_until_expiry,
                qr_thumbnail,
                batch,
            });
        }
        Ok(rows)
    }

    pub async fn consumer_view(&self, batch_id: &str, locale: &Locale) -> Result<ConsumerView, AppError> {
        let batch = self.get(batch_id).await?;
        let today = clock::today_local(&self.config.utc_offset);
        let classification =
            expiry::classify_text(&batch.expiry_date, today, self.config.near_expiry_days);

        Ok(ConsumerView {
            status: classification.status,
            status_label: classification.label(locale),
            batch_id: batch.batch_id,
            variant: batch.variant,
            production_date: batch.production_date,
            production_site: batch.production_site,
            warehouse_location: batch.warehouse_location,
            expiry_date: batch.expiry_date,
            person_in_charge: batch.person_in_charge,
        })
    }

    pub async fn activity_log(&self) -> Result<Vec<ActivityLogEntry>, AppError> {
        self.activity_repo.list().await
    }
}
