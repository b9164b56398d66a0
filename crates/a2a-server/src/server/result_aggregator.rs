//! Result aggregator: folds queue events into the persisted task.

use std::sync::Arc;

use tracing::warn;

use crate::error::A2AError;
use crate::types::core::{Message, Part, Task, TaskState, TaskStatus};
use crate::types::events::{Event, TaskArtifactUpdateEvent, TaskStatusUpdateEvent};
use crate::types::requests::SendMessageResponse;

use super::event_queue::EventQueue;
use super::push_notification::PushNotificationSender;
use super::store::TaskStore;

/// Consumes events for one task and keeps the stored record current.
///
/// The aggregator is the single writer of the task record during execution;
/// streaming subscribers observe raw events and never persist.
#[derive(Clone)]
pub struct ResultAggregator {
    task_store: Arc<dyn TaskStore>,
    task_id: String,
    push_sender: Option<Arc<dyn PushNotificationSender>>,
}

impl ResultAggregator {
    pub fn new(task_store: Arc<dyn TaskStore>, task_id: impl Into<String>) -> Self {
        Self {
            task_store,
            task_id: task_id.into(),
            push_sender: None,
        }
    }

    /// Notify webhooks whenever a status-bearing event is applied, including
    /// events applied by background consumption after an early return.
    pub fn with_push_sender(mut self, sender: Arc<dyn PushNotificationSender>) -> Self {
        self.push_sender = Some(sender);
        self
    }

    /// Apply one event to the stored task.
    pub async fn process_event(&self, event: &Event) -> Result<(), A2AError> {
        let mut task = self.load_task().await?;

        match event {
            Event::StatusUpdate(update) => self.apply_status_update(&mut task, update),
            Event::ArtifactUpdate(update) => self.apply_artifact_update(&mut task, update),
            Event::Task(snapshot) => task = snapshot.clone(),
            Event::Message(message) => task.history.push(message.clone()),
        }

        self.task_store.save(&task).await
    }

    fn apply_status_update(&self, task: &mut Task, update: &TaskStatusUpdateEvent) {
        if task.status.state.is_terminal() {
            warn!(
                task_id = %self.task_id,
                state = %task.status.state,
                "status update for terminal task, ignoring"
            );
            return;
        }

        // The previous status message moves into history before the new
        // status replaces it.
        if let Some(previous) = task.status.message.take() {
            task.history.push(*previous);
        }

        if let Some(ref event_meta) = update.metadata {
            merge_metadata(&mut task.metadata, event_meta);
        }

        task.status = TaskStatus {
            state: update.status.state,
            message: update.status.message.clone(),
            timestamp: update
                .status
                .timestamp
                .clone()
                .or_else(|| Some(chrono::Utc::now().to_rfc3339())),
        };
    }

    fn apply_artifact_update(&self, task: &mut Task, update: &TaskArtifactUpdateEvent) {
        let artifact_id = &update.artifact.artifact_id;
        let existing = task
            .artifacts
            .iter()
            .position(|a| &a.artifact_id == artifact_id);

        if !update.append {
            match existing {
                Some(index) => task.artifacts[index] = update.artifact.clone(),
                None => task.artifacts.push(update.artifact.clone()),
            }
        } else if let Some(index) = existing {
            task.artifacts[index]
                .parts
                .extend(update.artifact.parts.clone());
        } else {
            // An append chunk with no base artifact has nothing to attach to.
            warn!(
                task_id = %self.task_id,
                artifact_id = %artifact_id,
                "append chunk for unknown artifact, ignoring"
            );
        }
    }

    /// Consume the queue to end-of-stream and return the final result.
    ///
    /// A `Message` event is a direct agent reply; it ends consumption
    /// immediately without touching the task record.
    pub async fn consume_all(&self, queue: EventQueue) -> Result<SendMessageResponse, A2AError> {
        while let Some(event) = queue.dequeue().await {
            if let Event::Message(message) = event {
                return Ok(SendMessageResponse::Message(message));
            }
            self.process_event(&event).await?;
        }
        Ok(SendMessageResponse::Task(self.current_task().await?))
    }

    /// Consume the queue, returning early with the current task snapshot when
    /// the task is interrupted (`input-required` / `auth-required`) or, for a
    /// non-blocking call, after the first applied event.
    ///
    /// Returns `(result, continuing)`; when `continuing` is true, consumption
    /// keeps running on a background task so the record still reaches its
    /// final state.
    pub async fn consume_and_break_on_interrupt(
        &self,
        queue: EventQueue,
        blocking: bool,
    ) -> Result<(SendMessageResponse, bool), A2AError> {
        while let Some(event) = queue.dequeue().await {
            if let Event::Message(message) = event {
                return Ok((SendMessageResponse::Message(message), false));
            }
            self.process_event(&event).await?;

            let interrupted = matches!(
                &event,
                Event::StatusUpdate(update) if update.status.state.is_interrupted()
            );
            if interrupted || !blocking {
                self.continue_consuming(queue);
                let task = self.current_task().await?;
                return Ok((SendMessageResponse::Task(task), true));
            }
        }
        Ok((SendMessageResponse::Task(self.current_task().await?), false))
    }

    /// Keep draining the queue in the background after an early return.
    ///
    /// State changes applied here still reach registered webhooks, so the
    /// terminal state is push-notified even when the caller got an early
    /// snapshot.
    fn continue_consuming(&self, queue: EventQueue) {
        let aggregator = self.clone();
        tokio::spawn(async move {
            while let Some(event) = queue.dequeue().await {
                if let Event::Message(_) = event {
                    continue;
                }
                if let Err(e) = aggregator.process_event(&event).await {
                    warn!(
                        task_id = %aggregator.task_id,
                        error = %e,
                        "background event processing failed"
                    );
                    break;
                }
                aggregator.notify_state_change(&event).await;
            }
        });
    }

    async fn notify_state_change(&self, event: &Event) {
        if !matches!(event, Event::StatusUpdate(_) | Event::Task(_)) {
            return;
        }
        let Some(ref sender) = self.push_sender else {
            return;
        };
        if let Ok(Some(task)) = self.task_store.get(&self.task_id).await {
            sender.send_notification(&task).await;
        }
    }

    /// Mark the task failed with an explanatory agent message.
    pub async fn mark_failed(&self, message: &str) -> Result<Task, A2AError> {
        let mut task = self.load_task().await?;
        task.status = TaskStatus {
            state: TaskState::Failed,
            message: Some(Box::new(Message::agent(vec![Part::text(message)]))),
            timestamp: Some(chrono::Utc::now().to_rfc3339()),
        };
        self.task_store.save(&task).await?;
        Ok(task)
    }

    /// The task's current stored state.
    pub async fn current_task(&self) -> Result<Task, A2AError> {
        self.load_task().await
    }

    async fn load_task(&self) -> Result<Task, A2AError> {
        self.task_store
            .get(&self.task_id)
            .await?
            .ok_or_else(|| A2AError::task_not_found(&self.task_id))
    }
}

fn merge_metadata(target: &mut Option<serde_json::Value>, incoming: &serde_json::Value) {
    match target {
        Some(existing) => {
            if let (Some(existing_obj), Some(incoming_obj)) =
                (existing.as_object_mut(), incoming.as_object())
            {
                for (key, value) in incoming_obj {
                    existing_obj.insert(key.clone(), value.clone());
                }
            }
        }
        None => *target = Some(incoming.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::store::InMemoryTaskStore;
    use crate::types::core::Artifact;

    async fn setup(state: TaskState) -> (ResultAggregator, Arc<InMemoryTaskStore>) {
        let store = Arc::new(InMemoryTaskStore::new());
        store.save(&Task::new("t1", "ctx-1", state)).await.unwrap();
        let aggregator = ResultAggregator::new(store.clone(), "t1");
        (aggregator, store)
    }

    fn status_event(state: TaskState, message: Option<Message>) -> Event {
        Event::StatusUpdate(TaskStatusUpdateEvent {
            task_id: "t1".to_string(),
            context_id: "ctx-1".to_string(),
            status: TaskStatus {
                state,
                message: message.map(Box::new),
                timestamp: Some("2025-01-01T00:00:00Z".to_string()),
            },
            r#final: state.is_terminal(),
            metadata: None,
        })
    }

    fn artifact_event(artifact_id: &str, text: &str, append: bool) -> Event {
        Event::ArtifactUpdate(TaskArtifactUpdateEvent {
            task_id: "t1".to_string(),
            context_id: "ctx-1".to_string(),
            artifact: Artifact {
                artifact_id: artifact_id.to_string(),
                name: None,
                description: None,
                parts: vec![Part::text(text)],
                metadata: None,
                extensions: vec![],
            },
            append,
            last_chunk: false,
            metadata: None,
        })
    }

    #[tokio::test]
    async fn test_status_update_applied() {
        let (aggregator, _) = setup(TaskState::Submitted).await;
        aggregator
            .process_event(&status_event(TaskState::Working, None))
            .await
            .unwrap();

        let task = aggregator.current_task().await.unwrap();
        assert_eq!(task.status.state, TaskState::Working);
        assert_eq!(
            task.status.timestamp.as_deref(),
            Some("2025-01-01T00:00:00Z")
        );
    }

    #[tokio::test]
    async fn test_previous_status_message_moves_to_history() {
        let (aggregator, _) = setup(TaskState::Submitted).await;
        let interim = Message::agent(vec![Part::text("thinking")]);
        aggregator
            .process_event(&status_event(TaskState::Working, Some(interim)))
            .await
            .unwrap();
        aggregator
            .process_event(&status_event(TaskState::Completed, None))
            .await
            .unwrap();

        let task = aggregator.current_task().await.unwrap();
        assert_eq!(task.status.state, TaskState::Completed);
        assert!(task.status.message.is_none());
        assert_eq!(task.history.len(), 1);
    }

    #[tokio::test]
    async fn test_terminal_task_rejects_further_transitions() {
        let (aggregator, _) = setup(TaskState::Completed).await;
        aggregator
            .process_event(&status_event(TaskState::Working, None))
            .await
            .unwrap();

        let task = aggregator.current_task().await.unwrap();
        assert_eq!(task.status.state, TaskState::Completed);
    }

    #[tokio::test]
    async fn test_artifact_new_and_append() {
        let (aggregator, _) = setup(TaskState::Working).await;
        aggregator
            .process_event(&artifact_event("a1", "hello ", false))
            .await
            .unwrap();
        aggregator
            .process_event(&artifact_event("a1", "world", true))
            .await
            .unwrap();

        let task = aggregator.current_task().await.unwrap();
        assert_eq!(task.artifacts.len(), 1);
        assert_eq!(task.artifacts[0].parts.len(), 2);
    }

    #[tokio::test]
    async fn test_artifact_append_without_base_ignored() {
        let (aggregator, _) = setup(TaskState::Working).await;
        aggregator
            .process_event(&artifact_event("a1", "orphan", true))
            .await
            .unwrap();

        let task = aggregator.current_task().await.unwrap();
        assert!(task.artifacts.is_empty());
    }

    #[tokio::test]
    async fn test_artifact_replace() {
        let (aggregator, _) = setup(TaskState::Working).await;
        aggregator
            .process_event(&artifact_event("a1", "draft", false))
            .await
            .unwrap();
        aggregator
            .process_event(&artifact_event("a1", "final", false))
            .await
            .unwrap();

        let task = aggregator.current_task().await.unwrap();
        assert_eq!(task.artifacts.len(), 1);
        assert_eq!(task.artifacts[0].parts.len(), 1);
    }

    #[tokio::test]
    async fn test_task_snapshot_replaces_record() {
        let (aggregator, _) = setup(TaskState::Submitted).await;
        let snapshot = Task::new("t1", "ctx-1", TaskState::Working);
        aggregator
            .process_event(&Event::Task(snapshot))
            .await
            .unwrap();

        let task = aggregator.current_task().await.unwrap();
        assert_eq!(task.status.state, TaskState::Working);
    }

    #[tokio::test]
    async fn test_consume_all_to_completion() {
        let (aggregator, _) = setup(TaskState::Submitted).await;
        let queue = EventQueue::new();
        queue.enqueue(status_event(TaskState::Working, None)).await;
        queue.enqueue(status_event(TaskState::Completed, None)).await;
        queue.close().await;

        let result = aggregator.consume_all(queue).await.unwrap();
        match result {
            SendMessageResponse::Task(task) => {
                assert_eq!(task.status.state, TaskState::Completed)
            }
            SendMessageResponse::Message(_) => panic!("expected Task"),
        }
    }

    #[tokio::test]
    async fn test_consume_all_message_short_circuits() {
        let (aggregator, _) = setup(TaskState::Submitted).await;
        let queue = EventQueue::new();
        queue
            .enqueue(Event::Message(Message::agent(vec![Part::text("hi")])))
            .await;
        queue.close().await;

        let result = aggregator.consume_all(queue).await.unwrap();
        assert!(matches!(result, SendMessageResponse::Message(_)));
    }

    #[tokio::test]
    async fn test_interrupt_breaks_blocking_consumption() {
        let (aggregator, _) = setup(TaskState::Submitted).await;
        let queue = EventQueue::new();
        queue
            .enqueue(status_event(TaskState::InputRequired, None))
            .await;

        let (result, continuing) = aggregator
            .consume_and_break_on_interrupt(queue.clone(), true)
            .await
            .unwrap();
        assert!(continuing);
        match result {
            SendMessageResponse::Task(task) => {
                assert_eq!(task.status.state, TaskState::InputRequired)
            }
            SendMessageResponse::Message(_) => panic!("expected Task"),
        }
        queue.close().await;
    }

    #[tokio::test]
    async fn test_non_blocking_returns_after_first_event() {
        let (aggregator, _) = setup(TaskState::Submitted).await;
        let queue = EventQueue::new();
        queue.enqueue(status_event(TaskState::Working, None)).await;

        let (result, continuing) = aggregator
            .consume_and_break_on_interrupt(queue.clone(), false)
            .await
            .unwrap();
        assert!(continuing);
        match result {
            SendMessageResponse::Task(task) => {
                assert_eq!(task.status.state, TaskState::Working)
            }
            SendMessageResponse::Message(_) => panic!("expected Task"),
        }

        // Background consumption still drives the record to completion.
        queue.enqueue(status_event(TaskState::Completed, None)).await;
        queue.close().await;
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        let task = aggregator.current_task().await.unwrap();
        assert_eq!(task.status.state, TaskState::Completed);
    }

    struct RecordingSender {
        states: std::sync::Mutex<Vec<TaskState>>,
    }

    #[async_trait::async_trait]
    impl PushNotificationSender for RecordingSender {
        async fn send_notification(&self, task: &Task) {
            self.states.lock().unwrap().push(task.status.state);
        }
    }

    #[tokio::test]
    async fn test_background_consumption_notifies_terminal_state() {
        let (aggregator, _) = setup(TaskState::Submitted).await;
        let sender = Arc::new(RecordingSender {
            states: std::sync::Mutex::new(Vec::new()),
        });
        let aggregator = aggregator.with_push_sender(sender.clone());

        let queue = EventQueue::new();
        queue.enqueue(status_event(TaskState::Working, None)).await;
        let (_, continuing) = aggregator
            .consume_and_break_on_interrupt(queue.clone(), false)
            .await
            .unwrap();
        assert!(continuing);

        queue.enqueue(status_event(TaskState::Completed, None)).await;
        queue.close().await;
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        let states = sender.states.lock().unwrap();
        assert!(states.contains(&TaskState::Completed));
    }

    #[tokio::test]
    async fn test_mark_failed() {
        let (aggregator, _) = setup(TaskState::Working).await;
        let task = aggregator.mark_failed("boom").await.unwrap();
        assert_eq!(task.status.state, TaskState::Failed);
        assert!(task.status.message.is_some());
    }

    #[tokio::test]
    async fn test_missing_task_errors() {
        let store = Arc::new(InMemoryTaskStore::new());
        let aggregator = ResultAggregator::new(store, "nonexistent");
        assert!(aggregator.current_task().await.is_err());
    }
}
