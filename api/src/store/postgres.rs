use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use taskpilot_core::tasks::{NewTask, Task};

use super::{StoreError, TaskStore, new_task_id};

pub struct PgTaskStore {
    pool: PgPool,
}

impl PgTaskStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct TaskRow {
    id: String,
    user_id: String,
    title: String,
    description: String,
    due_date: Option<DateTime<Utc>>,
    completed: Option<bool>,
}

impl From<TaskRow> for Task {
    fn from(row: TaskRow) -> Self {
        Task {
            id: row.id,
            user_id: row.user_id,
            title: row.title,
            description: row.description,
            due_date: row.due_date,
            completed: row.completed,
        }
    }
}

const COLUMNS: &str = "id, user_id, title, description, due_date, completed";

#[async_trait]
impl TaskStore for PgTaskStore {
    async fn list(&self, user_id: &str) -> Result<Vec<Task>, StoreError> {
        let rows = sqlx::query_as::<_, TaskRow>(&format!(
            "SELECT {COLUMNS} FROM tasks WHERE user_id = $1 ORDER BY created_at, id"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Task::from).collect())
    }

    async fn get(&self, id: &str) -> Result<Option<Task>, StoreError> {
        let row = sqlx::query_as::<_, TaskRow>(&format!("SELECT {COLUMNS} FROM tasks WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Task::from))
    }

    async fn create(&self, task: NewTask, user_id: &str) -> Result<Task, StoreError> {
        let task = task.into_task(new_task_id(), user_id.to_string());
        sqlx::query(
            "INSERT INTO tasks (id, user_id, title, description, due_date, completed) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(&task.id)
        .bind(&task.user_id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.due_date)
        .bind(task.completed)
        .execute(&self.pool)
        .await?;
        Ok(task)
    }

    async fn update(&self, task: Task) -> Result<Option<Task>, StoreError> {
        let row = sqlx::query_as::<_, TaskRow>(&format!(
            "UPDATE tasks SET title = $2, description = $3, due_date = $4, completed = $5 \
             WHERE id = $1 RETURNING {COLUMNS}"
        ))
        .bind(&task.id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.due_date)
        .bind(task.completed)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Task::from))
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> bool {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .is_ok()
    }
}
