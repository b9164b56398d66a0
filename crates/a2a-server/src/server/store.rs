//! Task store trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::A2AError;
use crate::types::core::Task;

/// Durable storage for tasks, keyed by task id.
///
/// Each task is independently owned; no multi-key transactional guarantees
/// are required. Concurrent save/get/delete on the same id must be
/// linearizable.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Upsert by `task.id`.
    async fn save(&self, task: &Task) -> Result<(), A2AError>;

    async fn get(&self, task_id: &str) -> Result<Option<Task>, A2AError>;

    /// Remove the record; absent ids are not an error.
    async fn delete(&self, task_id: &str) -> Result<(), A2AError>;
}

/// In-memory task store guarded by a single mutex.
#[derive(Clone, Default)]
pub struct InMemoryTaskStore {
    tasks: Arc<Mutex<HashMap<String, Task>>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn save(&self, task: &Task) -> Result<(), A2AError> {
        let mut tasks = self.tasks.lock().await;
        tasks.insert(task.id.clone(), task.clone());
        Ok(())
    }

    async fn get(&self, task_id: &str) -> Result<Option<Task>, A2AError> {
        let tasks = self.tasks.lock().await;
        Ok(tasks.get(task_id).cloned())
    }

    async fn delete(&self, task_id: &str) -> Result<(), A2AError> {
        let mut tasks = self.tasks.lock().await;
        tasks.remove(task_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::core::TaskState;

    #[tokio::test]
    async fn test_save_and_get() {
        let store = InMemoryTaskStore::new();
        let task = Task::new("t1", "ctx-1", TaskState::Submitted);

        store.save(&task).await.unwrap();
        let loaded = store.get("t1").await.unwrap();
        assert!(loaded.is_some());
        assert_eq!(loaded.unwrap().id, "t1");
    }

    #[tokio::test]
    async fn test_get_missing() {
        let store = InMemoryTaskStore::new();
        let loaded = store.get("nonexistent").await.unwrap();
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn test_save_overwrite() {
        let store = InMemoryTaskStore::new();
        let mut task = Task::new("t1", "ctx-1", TaskState::Submitted);
        store.save(&task).await.unwrap();

        task.status.state = TaskState::Working;
        store.save(&task).await.unwrap();

        let loaded = store.get("t1").await.unwrap().unwrap();
        assert_eq!(loaded.status.state, TaskState::Working);
    }

    #[tokio::test]
    async fn test_delete() {
        let store = InMemoryTaskStore::new();
        let task = Task::new("t1", "ctx-1", TaskState::Submitted);
        store.save(&task).await.unwrap();

        store.delete("t1").await.unwrap();
        assert!(store.get("t1").await.unwrap().is_none());

        // Deleting an absent id is not an error.
        store.delete("t1").await.unwrap();
    }
}
