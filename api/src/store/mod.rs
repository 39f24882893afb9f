//! Task persistence. The handlers own authorization; stores only persist.

use async_trait::async_trait;
use taskpilot_core::tasks::{NewTask, Task};

pub mod memory;
pub mod postgres;

pub use memory::MemoryTaskStore;
pub use postgres::PgTaskStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn list(&self, user_id: &str) -> Result<Vec<Task>, StoreError>;
    async fn get(&self, id: &str) -> Result<Option<Task>, StoreError>;
    /// Assigns a fresh id and stores the task under `user_id`.
    async fn create(&self, task: NewTask, user_id: &str) -> Result<Task, StoreError>;
    /// Replaces the stored record with the same id. `None` if it is gone.
    async fn update(&self, task: Task) -> Result<Option<Task>, StoreError>;
    async fn delete(&self, id: &str) -> Result<bool, StoreError>;
    async fn ping(&self) -> bool {
        true
    }
}

pub(crate) fn new_task_id() -> String {
    uuid::Uuid::now_v7().to_string()
}
