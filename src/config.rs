// src/config.rs

use std::{env, path::PathBuf, sync::Arc, time::Duration};

use anyhow::Context;
use chrono::FixedOffset;
use sqlx::SqlitePool;
use tokio::sync::RwLock;

use crate::{
    common::db_utils,
    db::{ActivityRepository, BatchRepository},
    services::{
        backup_service::BackupService,
        backup_sink::{BackupSink, GitHubBackupSink, GitHubSinkConfig},
        batch_service::BatchService,
        document_service::DocumentService,
        qr_service::QrService,
    },
};

/// Remote backup settings, present only when both repo and token are set.
#[derive(Debug, Clone)]
pub struct BackupConfig {
    pub api_url: String,
    pub repo: String,
    pub token: String,
    pub branch: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: String,
    pub qr_dir: PathBuf,
    pub logo_path: Option<PathBuf>,
    pub fonts_dir: PathBuf,
    pub font_family: String,
    pub company_name: String,
    pub public_base_url: String,
    pub near_expiry_days: i64,
    pub utc_offset: FixedOffset,
    pub operator_token: Option<String>,
    pub backup: Option<BackupConfig>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let data_dir = PathBuf::from(var_or("DATA_DIR", "data"));
        let qr_dir = env::var("QR_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("qr_codes"));

        let offset_hours: i32 = parse_var("UTC_OFFSET_HOURS", 7)?;
        let utc_offset = FixedOffset::east_opt(offset_hours * 3600)
            .with_context(|| format!("UTC_OFFSET_HOURS out of range: {}", offset_hours))?;

        let backup = match (optional_var("BACKUP_REPO"), optional_var("BACKUP_TOKEN")) {
            (Some(repo), Some(token)) => Some(BackupConfig {
                api_url: var_or("BACKUP_API_URL", "https://api.github.com"),
                repo,
                token,
                branch: var_or("BACKUP_BRANCH", "main"),
                timeout: Duration::from_secs(parse_var("BACKUP_TIMEOUT_SECS", 30)?),
            }),
            _ => None,
        };

        Ok(Self {
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| {
                format!("sqlite://{}", data_dir.join("traceability.db").display())
            }),
            bind_addr: var_or("BIND_ADDR", "0.0.0.0:3000"),
            qr_dir,
            logo_path: optional_var("LOGO_PATH").map(PathBuf::from),
            fonts_dir: PathBuf::from(var_or("FONTS_DIR", "./fonts")),
            font_family: var_or("FONT_FAMILY", "DejaVuSerif"),
            company_name: var_or("COMPANY_NAME", "Harlur Coffee"),
            public_base_url: var_or("PUBLIC_BASE_URL", "http://localhost:3000/consumer"),
            near_expiry_days: parse_var("NEAR_EXPIRY_DAYS", 7)?,
            utc_offset,
            operator_token: optional_var("OPERATOR_TOKEN"),
            backup,
        })
    }
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn optional_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value: {}", key, raw)),
        Err(_) => Ok(default),
    }
}

/// Last payload decoded from a polled camera frame.
pub type LatestScan = Arc<RwLock<Option<String>>>;

#[derive(Clone)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub config: Arc<AppConfig>,
    pub batch_service: BatchService,
    pub document_service: DocumentService,
    pub backup_service: BackupService,
    pub qr_service: QrService,
    pub latest_scan: LatestScan,
}

impl AppState {
    pub async fn new(config: AppConfig) -> anyhow::Result<Self> {
        let db_pool = db_utils::connect_pool(&config.database_url).await?;
        tracing::info!("✅ Database connection established");

        let sink: Option<Arc<dyn BackupSink>> = match &config.backup {
            Some(backup) => Some(Arc::new(GitHubBackupSink::new(GitHubSinkConfig::from(backup))?)),
            None => {
                tracing::warn!("Remote backup disabled (BACKUP_REPO / BACKUP_TOKEN not set)");
                None
            }
        };

        Self::with_parts(db_pool, config, sink).await
    }

    /// Wires the dependency graph around an existing pool and backup sink.
    pub async fn with_parts(
        db_pool: SqlitePool,
        config: AppConfig,
        sink: Option<Arc<dyn BackupSink>>,
    ) -> anyhow::Result<Self> {
        tokio::fs::create_dir_all(&config.qr_dir)
            .await
            .with_context(|| format!("cannot create QR directory {}", config.qr_dir.display()))?;

        let config = Arc::new(config);

        let batch_repo = BatchRepository::new(db_pool.clone());
        let activity_repo = ActivityRepository::new(db_pool.clone());

        let qr_service = QrService::new(
            config.public_base_url.clone(),
            config.qr_dir.clone(),
            config.logo_path.clone(),
        );
        let batch_service = BatchService::new(
            db_pool.clone(),
            batch_repo.clone(),
            activity_repo.clone(),
            qr_service.clone(),
            config.clone(),
        );
        let document_service = DocumentService::new(qr_service.clone(), config.clone());
        let backup_service = BackupService::new(
            db_pool.clone(),
            batch_repo,
            activity_repo,
            qr_service.clone(),
            sink,
            config.clone(),
        );

        Ok(Self {
            db_pool,
            config,
            batch_service,
            document_service,
            backup_service,
            qr_service,
            latest_scan: LatestScan::default(),
        })
    }
}
