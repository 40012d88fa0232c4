use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::info;

use crate::config::Config;
use crate::error::Result;
use crate::services::{TaskService, WorkEntryService};

#[derive(Debug, Clone)]
pub struct Db {
    pool: SqlitePool,
}

impl Db {
    pub async fn connect(config: &Config) -> Result<Self> {
        if let Some(parent) = config.database_path().as_deref().and_then(|p| p.parent()) {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = config
            .database
            .connect_options()?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePool::connect_with(options).await?;
        info!(database = %config.database, "opened database");

        Self::migrate(pool).await
    }

    /// Private in-memory database. A single connection keeps every query on
    /// the same memory store.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        Self::migrate(pool).await
    }

    async fn migrate(pool: SqlitePool) -> Result<Self> {
        sqlx::migrate!("./migrations").run(&pool).await?;
        info!("database migrations complete");

        Ok(Db { pool })
    }

    pub fn tasks(&self) -> TaskService {
        TaskService::new(self.pool.clone())
    }

    pub fn work_entries(&self) -> WorkEntryService {
        WorkEntryService::new(self.pool.clone())
    }

    /// Marks a task completed, finishing its running work entry first so no
    /// timer is left open on a closed task.
    pub async fn complete_task(&self, task_id: i64) -> Result<()> {
        let entries = self.work_entries();
        if let Some(entry) = entries.find_current_work_entry(task_id).await? {
            entries.finish_work_entry(entry.id).await?;
        }
        self.tasks().complete_by_id(task_id).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
