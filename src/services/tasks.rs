use sqlx::sqlite::SqlitePool;
use tracing::debug;

use crate::error::Result;
use crate::models::Task;

#[derive(Debug, Clone)]
pub struct TaskService {
    pool: SqlitePool,
}

impl TaskService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Inserts a task; `completed` takes the schema default.
    pub async fn create(&self, name: &str) -> Result<i64> {
        let result = sqlx::query("INSERT INTO tasks (name) VALUES (?)")
            .bind(name)
            .execute(&self.pool)
            .await?;

        let id = result.last_insert_rowid();
        debug!(id, name, "created task");
        Ok(id)
    }

    /// Unknown ids update nothing and are not reported.
    pub async fn complete_by_id(&self, id: i64) -> Result<()> {
        let result = sqlx::query("UPDATE tasks SET completed = true WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        debug!(id, rows = result.rows_affected(), "completed task");
        Ok(())
    }

    pub async fn find_all_non_completed_tasks(&self) -> Result<Vec<Task>> {
        let rows = sqlx::query_as::<_, Task>(
            "SELECT id, name, completed FROM tasks WHERE completed = false",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn get(&self, id: i64) -> Result<Option<Task>> {
        let row = sqlx::query_as::<_, Task>("SELECT id, name, completed FROM tasks WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    /// Like [`TaskService::get`], but falls back to [`Task::unknown`].
    pub async fn find_by_id(&self, id: i64) -> Result<Task> {
        Ok(self.get(id).await?.unwrap_or_else(Task::unknown))
    }
}

#[cfg(test)]
mod tests {
    use crate::db::Db;
    use crate::models::Task;

    #[tokio::test]
    async fn created_task_is_listed_as_not_completed() {
        let db = Db::in_memory().await.unwrap();
        let tasks = db.tasks();

        let id = tasks.create("X").await.unwrap();
        let open = tasks.find_all_non_completed_tasks().await.unwrap();

        let task = open.iter().find(|t| t.id == id).unwrap();
        assert_eq!(task.name, "X");
        assert!(!task.completed);
    }

    #[tokio::test]
    async fn completed_task_leaves_the_open_list() {
        let db = Db::in_memory().await.unwrap();
        let tasks = db.tasks();

        let keep = tasks.create("keep").await.unwrap();
        let done = tasks.create("done").await.unwrap();
        tasks.complete_by_id(done).await.unwrap();

        let open = tasks.find_all_non_completed_tasks().await.unwrap();
        let ids: Vec<i64> = open.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![keep]);

        assert!(tasks.find_by_id(done).await.unwrap().completed);
    }

    #[tokio::test]
    async fn completing_unknown_id_is_silent() {
        let db = Db::in_memory().await.unwrap();
        db.tasks().complete_by_id(4242).await.unwrap();
    }

    #[tokio::test]
    async fn missing_task_is_the_unknown_sentinel() {
        let db = Db::in_memory().await.unwrap();
        let tasks = db.tasks();

        assert_eq!(tasks.find_by_id(77).await.unwrap(), Task::unknown());
        assert_eq!(tasks.get(77).await.unwrap(), None);
    }

    #[tokio::test]
    async fn empty_and_duplicate_names_are_accepted() {
        let db = Db::in_memory().await.unwrap();
        let tasks = db.tasks();

        let a = tasks.create("").await.unwrap();
        let b = tasks.create("same").await.unwrap();
        let c = tasks.create("same").await.unwrap();

        assert_ne!(b, c);
        assert_eq!(tasks.find_by_id(a).await.unwrap().name, "");
        assert_eq!(tasks.find_all_non_completed_tasks().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn first_task_gets_id_one() {
        let db = Db::in_memory().await.unwrap();
        assert_eq!(db.tasks().create("Write report").await.unwrap(), 1);
    }
}
