use chrono::TimeDelta;
use sqlx::sqlite::SqlitePool;
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::WorkEntry;

// Timestamps are written by the database as RFC 3339 UTC text with
// millisecond precision.

#[derive(Debug, Clone)]
pub struct WorkEntryService {
    pool: SqlitePool,
}

impl WorkEntryService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Opens a work entry for `task_id`, started now.
    ///
    /// Fails with [`Error::WorkEntryAlreadyOpen`] if the task already has a
    /// running entry.
    pub async fn create_work_entry(&self, task_id: i64) -> Result<i64> {
        let result = sqlx::query(
            "INSERT INTO work_entries (task_id, started_on)
             VALUES (?, strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))",
        )
        .bind(task_id)
        .execute(&self.pool)
        .await
        .map_err(|err| match err {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                Error::WorkEntryAlreadyOpen { task_id }
            }
            other => other.into(),
        })?;

        let id = result.last_insert_rowid();
        debug!(id, task_id, "started work entry");
        Ok(id)
    }

    pub async fn find_current_work_entry(&self, task_id: i64) -> Result<Option<WorkEntry>> {
        let row = sqlx::query_as::<_, WorkEntry>(
            "SELECT id, task_id, started_on, finished_on FROM work_entries
             WHERE task_id = ? AND finished_on IS NULL
             LIMIT 1",
        )
        .bind(task_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Unknown ids update nothing and are not reported.
    pub async fn finish_work_entry(&self, id: i64) -> Result<()> {
        let result = sqlx::query(
            "UPDATE work_entries SET finished_on = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
             WHERE id = ?",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        debug!(id, rows = result.rows_affected(), "finished work entry");
        Ok(())
    }

    /// Sum of `finished_on - started_on` over the task's closed entries.
    pub async fn calculate_total_time(&self, task_id: i64) -> Result<TimeDelta> {
        let millis: Option<i64> = sqlx::query_scalar(
            "SELECT SUM(CAST(ROUND(
                 (julianday(finished_on) - julianday(started_on)) * 86400000
             ) AS INTEGER))
             FROM work_entries
             WHERE task_id = ? AND finished_on IS NOT NULL",
        )
        .bind(task_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(TimeDelta::milliseconds(millis.unwrap_or(0)))
    }

    pub async fn find_work_entries(&self, task_id: i64) -> Result<Vec<WorkEntry>> {
        let rows = sqlx::query_as::<_, WorkEntry>(
            "SELECT id, task_id, started_on, finished_on FROM work_entries
             WHERE task_id = ?
             ORDER BY started_on, id",
        )
        .bind(task_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
