// src/models/activity.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

// Append-only: rows are never updated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLogEntry {
    #[schema(example = 42)]
    pub id: i64,
    #[schema(example = "2025-11-10 09:15:00")]
    pub logged_at: String,
    #[schema(example = "Tambah data batch BATCH001")]
    pub description: String,
}
