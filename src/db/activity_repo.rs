// src/db/activity_repo.rs

use sqlx::{Executor, Sqlite, SqlitePool};

use crate::{common::error::AppError, models::activity::ActivityLogEntry};

#[derive(Clone)]
pub struct ActivityRepository {
    pool: SqlitePool,
}

impl ActivityRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn append<'e, E>(
        &self,
        executor: E,
        logged_at: &str,
        description: &str,
    ) -> Result<ActivityLogEntry, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let entry = sqlx::query_as::<_, ActivityLogEntry>(
            "INSERT INTO activity_log (logged_at, description) VALUES (?, ?) RETURNING *",
        )
        .bind(logged_at)
        .bind(description)
        .fetch_one(executor)
        .await?;
        Ok(entry)
    }

    // Newest first
    pub async fn list(&self) -> Result<Vec<ActivityLogEntry>, AppError> {
        let entries = sqlx::query_as::<_, ActivityLogEntry>("SELECT * FROM activity_log ORDER BY id DESC")
            .fetch_all(&self.pool)
            .await?;
        Ok(entries)
    }
}
