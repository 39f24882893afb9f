use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use taskpilot_core::tasks::{NewTask, Task};
use tokio::sync::RwLock;

use super::{StoreError, TaskStore, new_task_id};

/// Process-local store, used when no database is configured.
#[derive(Default)]
pub struct MemoryTaskStore {
    /// id → (insertion sequence, task)
    tasks: RwLock<HashMap<String, (u64, Task)>>,
    next_seq: AtomicU64,
}

impl MemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskStore for MemoryTaskStore {
    async fn list(&self, user_id: &str) -> Result<Vec<Task>, StoreError> {
        let tasks = self.tasks.read().await;
        let mut owned: Vec<&(u64, Task)> = tasks
            .values()
            .filter(|(_, t)| t.user_id == user_id)
            .collect();
        owned.sort_by_key(|(seq, _)| *seq);
        Ok(owned.into_iter().map(|(_, t)| t.clone()).collect())
    }

    async fn get(&self, id: &str) -> Result<Option<Task>, StoreError> {
        Ok(self.tasks.read().await.get(id).map(|(_, t)| t.clone()))
    }

    async fn create(&self, task: NewTask, user_id: &str) -> Result<Task, StoreError> {
        let task = task.into_task(new_task_id(), user_id.to_string());
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        self.tasks
            .write()
            .await
            .insert(task.id.clone(), (seq, task.clone()));
        Ok(task)
    }

    async fn update(&self, task: Task) -> Result<Option<Task>, StoreError> {
        let mut tasks = self.tasks.write().await;
        match tasks.get_mut(&task.id) {
            Some((_, slot)) => {
                *slot = task.clone();
                Ok(Some(task))
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.tasks.write().await.remove(id).is_some())
    }
}
