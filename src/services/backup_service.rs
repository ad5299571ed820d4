// src/services/backup_service.rs

use std::{collections::HashSet, sync::Arc};

use sqlx::SqlitePool;

use crate::{
    common::{clock, error::AppError},
    config::AppConfig,
    db::{ActivityRepository, BatchRepository},
    models::{
        backup::BackupResult,
        batch::SortOrder,
    },
    services::{backup_sink::BackupSink, csv_export, qr_service::QrService},
};

const DEFAULT_MESSAGE: &str = "Backup manual";

#[derive(Clone)]
pub struct BackupService {
    pool: SqlitePool,
    batch_repo: BatchRepository,
    activity_repo: ActivityRepository,
    qr_service: QrService,
    sink: Option<Arc<dyn BackupSink>>,
    config: Arc<AppConfig>,
}

/// Remote file names become URL path segments: letters, digits, `-`, `_`, `.` only.
pub fn is_valid_backup_name(filename: &str) -> bool {
    !filename.is_empty()
        && !filename.starts_with('.')
        && filename
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

impl BackupService {
    pub fn new(
        pool: SqlitePool,
        batch_repo: BatchRepository,
        activity_repo: ActivityRepository,
        qr_service: QrService,
        sink: Option<Arc<dyn BackupSink>>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self { pool, batch_repo, activity_repo, qr_service, sink, config }
    }

    fn sink(&self) -> Result<&dyn BackupSink, AppError> {
        self.sink.as_deref().ok_or(AppError::BackupNotConfigured)
    }

    fn check_name(filename: &str) -> Result<(), AppError> {
        if is_valid_backup_name(filename) {
            Ok(())
        } else {
            let mut err = validator::ValidationError::new("backup_filename");
            err.message = Some("Invalid backup file name.".into());
            let mut errors = validator::ValidationErrors::new();
            errors.add("filename", err);
            Err(AppError::ValidationError(errors))
        }
    }

    /// Current table as CSV, oldest first so a restore keeps insertion order.
    pub async fn export_csv(&self) -> Result<(Vec<u8>, usize), AppError> {
        let batches = self.batch_repo.list_all(SortOrder::OldestFirst).await?;
        let rows = batches.len();
        Ok((csv_export::batches_to_csv(batches)?, rows))
    }

    pub async fn list_backups(&self) -> Result<Vec<String>, AppError> {
        self.sink()?.list().await
    }

    /// Uploads `content` under `backup/<filename>`, creating or overwriting it.
    pub async fn backup(&self, filename: &str, content: &[u8], message: &str) -> Result<(), AppError> {
        Self::check_name(filename)?;
        self.sink()?.store(filename, content, message).await?;

        let now = clock::now_local(&self.config.utc_offset);
        self.activity_repo
            .append(&self.pool, &now, &format!("Backup ke remote {}", filename))
            .await?;
        Ok(())
    }

    /// Snapshot of the whole table as `backup_<YYYYmmdd_HHMM>.csv`.
    pub async fn backup_now(&self, message: Option<&str>) -> Result<BackupResult, AppError> {
        let (csv, rows) = self.export_csv().await?;
        let filename = format!("backup_{}.csv", clock::backup_stamp(&self.config.utc_offset));

        self.backup(&filename, &csv, message.unwrap_or(DEFAULT_MESSAGE)).await?;
        Ok(BackupResult { filename, rows })
    }

    /// Replaces the whole table with the remote snapshot.
    /// Nothing local changes unless the fetch, the parse and the transaction all succeed.
    pub async fn restore(&self, filename: &str) -> Result<BackupResult, AppError> {
        Self::check_name(filename)?;

        // 1. Fetch + parse before touching the database
        let bytes = self.sink()?.fetch(filename).await?;
        let rows = csv_export::csv_to_rows(&bytes)?;
        let previous = self.batch_repo.list_all(SortOrder::OldestFirst).await?;

        // 2. Swap the table contents atomically
        let now = clock::now_local(&self.config.utc_offset);
        let mut tx = self.pool.begin().await?;

        let removed = self.batch_repo.delete_all(&mut *tx).await?;
        for row in &rows {
            self.batch_repo.insert_restored(&mut *tx, row).await?;
        }
        self.activity_repo
            .append(&mut *tx, &now, &format!("Restore dari {}", filename))
            .await?;

        tx.commit().await?;
        tracing::info!("♻️ Restored {} rows from {} ({} replaced)", rows.len(), filename, removed);

        // 3. Drop artifacts of batches the snapshot no longer has
        let restored: HashSet<&str> = rows.iter().map(|r| r.batch_id.as_str()).collect();
        for batch in previous.iter().filter(|b| !restored.contains(b.batch_id.as_str())) {
            self.qr_service.remove(&batch.batch_id).await;
        }

        // 4. Rebuild QR artifacts the restored rows do not have yet
        for row in &rows {
            if !self.qr_service.artifact_path(&row.batch_id).exists() {
                if let Err(e) = self.qr_service.generate(&row.batch_id).await {
                    tracing::warn!("QR not regenerated for {}: {}", row.batch_id, e);
                }
            }
        }

        Ok(BackupResult { filename: filename.to_string(), rows: rows.len() })
    }
}
