//! Queue lifecycle manager: task id to root event queue.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::A2AError;

use super::event_queue::EventQueue;

/// Registration conflicts on the task id -> queue map.
///
/// These are caller errors and always propagate; they are never folded into a
/// generic error so handlers can branch on them.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    #[error("a queue is already registered for task {task_id}")]
    TaskQueueExists { task_id: String },

    #[error("no queue registered for task {task_id}")]
    NoTaskQueue { task_id: String },
}

impl From<QueueError> for A2AError {
    fn from(err: QueueError) -> Self {
        A2AError::internal_error(err.to_string())
    }
}

/// Maps task ids to their root event queues, enforcing at most one root queue
/// per task id.
#[async_trait]
pub trait QueueManager: Send + Sync {
    /// Register a new root queue. Fails with [`QueueError::TaskQueueExists`]
    /// if one is already registered, which is what stops two handlers from
    /// double-driving the same task.
    async fn add(&self, task_id: &str, queue: EventQueue) -> Result<(), QueueError>;

    /// Look up the root queue without side effects.
    async fn get(&self, task_id: &str) -> Option<EventQueue>;

    /// Derive a subscriber queue for resubscription; `None` when the task has
    /// no active root queue.
    async fn tap(&self, task_id: &str) -> Option<EventQueue>;

    /// Close and deregister the root queue. Fails with
    /// [`QueueError::NoTaskQueue`] if none exists; double-close is a caller
    /// bug that should surface immediately.
    async fn close(&self, task_id: &str) -> Result<(), QueueError>;

    /// Create a fresh root queue if none exists, otherwise tap the existing
    /// one. The common start-or-attach request path uses this so handlers
    /// never branch on whether a task is new.
    async fn create_or_tap(&self, task_id: &str) -> EventQueue;
}

/// Single-process in-memory queue manager.
///
/// Distributed deployments need a collaborator that routes by task id to the
/// owning process; that is out of scope here.
#[derive(Clone, Default)]
pub struct InMemoryQueueManager {
    // One lock for the whole map, held only for map mutation, never for
    // queue I/O.
    queues: Arc<Mutex<HashMap<String, EventQueue>>>,
}

impl InMemoryQueueManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.queues.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.queues.lock().await.is_empty()
    }
}

#[async_trait]
impl QueueManager for InMemoryQueueManager {
    async fn add(&self, task_id: &str, queue: EventQueue) -> Result<(), QueueError> {
        let mut queues = self.queues.lock().await;
        if queues.contains_key(task_id) {
            return Err(QueueError::TaskQueueExists {
                task_id: task_id.to_string(),
            });
        }
        queues.insert(task_id.to_string(), queue);
        Ok(())
    }

    async fn get(&self, task_id: &str) -> Option<EventQueue> {
        self.queues.lock().await.get(task_id).cloned()
    }

    async fn tap(&self, task_id: &str) -> Option<EventQueue> {
        let queue = self.queues.lock().await.get(task_id).cloned()?;
        Some(queue.tap().await)
    }

    async fn close(&self, task_id: &str) -> Result<(), QueueError> {
        let queue = {
            let mut queues = self.queues.lock().await;
            queues.remove(task_id).ok_or_else(|| QueueError::NoTaskQueue {
                task_id: task_id.to_string(),
            })?
        };
        queue.close().await;
        Ok(())
    }

    async fn create_or_tap(&self, task_id: &str) -> EventQueue {
        let existing = {
            let mut queues = self.queues.lock().await;
            match queues.get(task_id) {
                Some(queue) => queue.clone(),
                None => {
                    let queue = EventQueue::new();
                    queues.insert(task_id.to_string(), queue.clone());
                    return queue;
                }
            }
        };
        existing.tap().await
    }
}
