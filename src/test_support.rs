// src/test_support.rs

use std::{
    collections::HashMap,
    path::Path,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use chrono::FixedOffset;
use tempfile::TempDir;

use crate::{
    common::{db_utils::memory_pool, error::AppError},
    config::{AppConfig, AppState},
    services::backup_sink::BackupSink,
};

pub fn offset() -> FixedOffset {
    FixedOffset::east_opt(7 * 3600).unwrap()
}

pub fn test_config(dir: &Path) -> AppConfig {
    AppConfig {
        database_url: "sqlite::memory:".into(),
        bind_addr: "127.0.0.1:0".into(),
        qr_dir: dir.join("qr_codes"),
        logo_path: None,
        fonts_dir: dir.join("fonts"),
        font_family: "DejaVuSerif".into(),
        company_name: "Harlur Coffee".into(),
        public_base_url: "https://trace.example.com/consumer".into(),
        near_expiry_days: 7,
        utc_offset: offset(),
        operator_token: None,
        backup: None,
    }
}

pub async fn state_with_config(config: AppConfig) -> AppState {
    AppState::with_parts(memory_pool().await, config, None).await.unwrap()
}

pub async fn test_state() -> (AppState, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let state = state_with_config(test_config(dir.path())).await;
    (state, dir)
}

pub async fn test_state_with_sink() -> (AppState, TempDir, Arc<MemorySink>) {
    let dir = tempfile::tempdir().unwrap();
    let sink = Arc::new(MemorySink::default());
    let state = AppState::with_parts(
        memory_pool().await,
        test_config(dir.path()),
        Some(sink.clone() as Arc<dyn BackupSink>),
    )
    .await
    .unwrap();
    (state, dir, sink)
}

/// In-process stand-in for the remote contents API.
#[derive(Default)]
pub struct MemorySink {
    files: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemorySink {
    pub fn put(&self, name: &str, content: Vec<u8>) {
        self.files.lock().unwrap().insert(name.to_string(), content);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.files.lock().unwrap().contains_key(name)
    }
}

#[async_trait]
impl BackupSink for MemorySink {
    async fn list(&self) -> Result<Vec<String>, AppError> {
        let mut names: Vec<String> = self.files.lock().unwrap().keys().cloned().collect();
        names.sort_unstable_by(|a, b| b.cmp(a));
        Ok(names)
    }

    async fn fetch(&self, filename: &str) -> Result<Vec<u8>, AppError> {
        self.files
            .lock()
            .unwrap()
            .get(filename)
            .cloned()
            .ok_or_else(|| AppError::BackupNotFound(filename.to_string()))
    }

    async fn store(&self, filename: &str, content: &[u8], _message: &str) -> Result<(), AppError> {
        self.put(filename, content.to_vec());
        Ok(())
    }
}
