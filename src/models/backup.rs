// src/models/backup.rs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BackupList {
    #[schema(example = json!(["backup_20251110_0915.csv"]))]
    pub files: Vec<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BackupResult {
    #[schema(example = "backup_20251110_0915.csv")]
    pub filename: String,
    #[schema(example = 12)]
    pub rows: usize,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BackupRequest {
    /// Commit message on the remote side.
    #[schema(example = "Backup manual")]
    pub message: Option<String>,
}
