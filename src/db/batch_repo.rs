// src/db/batch_repo.rs

use sqlx::{Executor, Sqlite, SqlitePool};

use crate::{
    common::{clock, error::AppError},
    models::batch::{BatchChanges, BatchCsvRow, NewBatch, ProductionBatch, SortOrder},
};

// Repository for the `production_batches` table
#[derive(Clone)]
pub struct BatchRepository {
    pool: SqlitePool,
}

impl BatchRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ---
    // Reads
    // ---

    pub async fn find_by_batch_id(&self, batch_id: &str) -> Result<Option<ProductionBatch>, AppError> {
        let batch = sqlx::query_as::<_, ProductionBatch>(
            "SELECT * FROM production_batches WHERE batch_id = ?",
        )
        .bind(batch_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(batch)
    }

    pub async fn exists<'e, E>(&self, executor: E, batch_id: &str) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM production_batches WHERE batch_id = ?")
            .bind(batch_id)
            .fetch_one(executor)
            .await?;
        Ok(count > 0)
    }

    pub async fn list_all(&self, order: SortOrder) -> Result<Vec<ProductionBatch>, AppError> {
        let sql = match order {
            SortOrder::NewestFirst => "SELECT * FROM production_batches ORDER BY id DESC",
            SortOrder::OldestFirst => "SELECT * FROM production_batches ORDER BY id ASC",
        };
        let batches = sqlx::query_as::<_, ProductionBatch>(sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(batches)
    }

    // ---
    // Writes (take an executor so they can join a transaction)
    // ---

    pub async fn insert<'e, E>(
        &self,
        executor: E,
        batch: &NewBatch,
        now: &str,
    ) -> Result<ProductionBatch, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, ProductionBatch>(
            r#"
            INSERT INTO production_batches (
                batch_id, production_date, person_in_charge, production_site,
                variant, warehouse_location, expiry_date, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&batch.batch_id)
        .bind(clock::format_date(batch.production_date))
        .bind(&batch.person_in_charge)
        .bind(&batch.production_site)
        .bind(&batch.variant)
        .bind(&batch.warehouse_location)
        .bind(clock::format_date(batch.expiry_date))
        .bind(now)
        .bind(now)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            // The UNIQUE constraint catches a racing insert the existence check missed
            if let Some(db_err) = e.as_database_error() {
                if db_err.is_unique_violation() {
                    return AppError::DuplicateBatchId(batch.batch_id.clone());
                }
            }
            e.into()
        })
    }

    /// Overwrites the provided fields only. Returns `None` when the id is absent.
    pub async fn update<'e, E>(
        &self,
        executor: E,
        batch_id: &str,
        changes: &BatchChanges,
        now: &str,
    ) -> Result<Option<ProductionBatch>, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let batch = sqlx::query_as::<_, ProductionBatch>(
            r#"
            UPDATE production_batches SET
                production_site    = COALESCE(?, production_site),
                variant            = COALESCE(?, variant),
                warehouse_location = COALESCE(?, warehouse_location),
                expiry_date        = COALESCE(?, expiry_date),
                updated_at         = ?
            WHERE batch_id = ?
            RETURNING *
            "#,
        )
        .bind(changes.production_site.as_deref())
        .bind(changes.variant.as_deref())
        .bind(changes.warehouse_location.as_deref())
        .bind(changes.expiry_date.map(clock::format_date))
        .bind(now)
        .bind(batch_id)
        .fetch_optional(executor)
        .await?;
        Ok(batch)
    }

    /// Returns whether a row was removed.
    pub async fn delete<'e, E>(&self, executor: E, batch_id: &str) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM production_batches WHERE batch_id = ?")
            .bind(batch_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_all<'e, E>(&self, executor: E) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM production_batches")
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    /// Inserts a restored row verbatim, timestamps included.
    pub async fn insert_restored<'e, E>(&self, executor: E, row: &BatchCsvRow) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query(
            r#"
            INSERT INTO production_batches (
                batch_id, production_date, person_in_charge, production_site,
                variant, warehouse_location, expiry_date, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&row.batch_id)
        .bind(&row.production_date)
        .bind(&row.person_in_charge)
        .bind(&row.production_site)
        .bind(&row.variant)
        .bind(&row.warehouse_location)
        .bind(&row.expiry_date)
        .bind(&row.created_at)
        .bind(&row.updated_at)
        .execute(executor)
        .await
        .map_err(|e| {
            if let Some(db_err) = e.as_database_error() {
                if db_err.is_unique_violation() {
                    return AppError::InvalidBackup(format!("duplicate batch id {}", row.batch_id));
                }
            }
            e.into()
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::db_utils::memory_pool;
    use chrono::NaiveDate;

    fn new_batch(batch_id: &str) -> NewBatch {
        NewBatch {
            batch_id: batch_id.to_string(),
            production_date: NaiveDate::from_ymd_opt(2025, 11, 10).unwrap(),
            person_in_charge: "Rina".into(),
            production_site: "Bandung".into(),
            variant: "Arabica".into(),
            warehouse_location: "A-2".into(),
            expiry_date: NaiveDate::from_ymd_opt(2026, 5, 9).unwrap(),
        }
    }

    #[tokio::test]
    async fn insert_stamps_both_timestamps() {
        let pool = memory_pool().await;
        let repo = BatchRepository::new(pool.clone());

        let batch = repo.insert(&pool, &new_batch("B1"), "2025-11-10 08:00:00").await.unwrap();
        assert_eq!(batch.created_at, "2025-11-10 08:00:00");
        assert_eq!(batch.updated_at, batch.created_at);
        assert_eq!(batch.production_date, "2025-11-10");
        assert!(repo.exists(&pool, "B1").await.unwrap());
    }

    #[tokio::test]
    async fn unique_constraint_maps_to_duplicate() {
        let pool = memory_pool().await;
        let repo = BatchRepository::new(pool.clone());
        repo.insert(&pool, &new_batch("B1"), "t0").await.unwrap();

        let err = repo.insert(&pool, &new_batch("B1"), "t1").await.unwrap_err();
        assert!(matches!(err, AppError::DuplicateBatchId(id) if id == "B1"));
    }

    #[tokio::test]
    async fn update_only_touches_given_fields() {
        let pool = memory_pool().await;
        let repo = BatchRepository::new(pool.clone());
        repo.insert(&pool, &new_batch("B1"), "t0").await.unwrap();

        let changes = BatchChanges { variant: Some("Robusta".into()), ..Default::default() };
        let updated = repo.update(&pool, "B1", &changes, "t1").await.unwrap().unwrap();
        assert_eq!(updated.variant, "Robusta");
        assert_eq!(updated.production_site, "Bandung");
        assert_eq!(updated.created_at, "t0");
        assert_eq!(updated.updated_at, "t1");

        assert!(repo.update(&pool, "NOPE", &changes, "t2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_all_honours_order() {
        let pool = memory_pool().await;
        let repo = BatchRepository::new(pool.clone());
        for id in ["A", "B", "C"] {
            repo.insert(&pool, &new_batch(id), "t").await.unwrap();
        }

        let newest: Vec<_> = repo.list_all(SortOrder::NewestFirst).await.unwrap()
            .into_iter().map(|b| b.batch_id).collect();
        let oldest: Vec<_> = repo.list_all(SortOrder::OldestFirst).await.unwrap()
            .into_iter().map(|b| b.batch_id).collect();
        assert_eq!(newest, ["C", "B", "A"]);
        assert_eq!(oldest, ["A", "B", "C"]);
    }

    #[tokio::test]
    async fn delete_reports_missing_rows() {
        let pool = memory_pool().await;
        let repo = BatchRepository::new(pool.clone());
        repo.insert(&pool, &new_batch("B1"), "t").await.unwrap();

        assert!(repo.delete(&pool, "B1").await.unwrap());
        assert!(!repo.delete(&pool, "B1").await.unwrap());
        assert!(repo.find_by_batch_id("B1").await.unwrap().is_none());
    }
}
