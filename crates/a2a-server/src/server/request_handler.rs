//! Default implementation of the request handler.
//!
//! Orchestrates the substrate: resolves or creates the task, builds the
//! request context, registers the event queue, spawns the agent executor,
//! aggregates events into the task store, and fans out push notifications.

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, error};

use crate::error::A2AError;
use crate::types::config::TaskPushNotificationConfig;
use crate::types::core::{Message, Part, Task, TaskState, TaskStatus};
use crate::types::events::{Event, TaskStatusUpdateEvent};
use crate::types::requests::{
    CancelTaskRequest, DeleteTaskPushNotificationConfigRequest,
    GetTaskPushNotificationConfigRequest, GetTaskRequest, ListTaskPushNotificationConfigRequest,
    SendMessageRequest, SendMessageResponse, SetTaskPushNotificationConfigRequest,
    SubscribeToTaskRequest,
};

use super::call_context::ServerCallContext;
use super::context::{RequestContext, RequestContextBuilder, SimpleRequestContextBuilder};
use super::event_queue::EventQueue;
use super::executor::AgentExecutor;
use super::handler::RequestHandler;
use super::push_notification::{PushNotificationConfigStore, PushNotificationSender};
use super::queue_manager::{InMemoryQueueManager, QueueManager};
use super::result_aggregator::ResultAggregator;
use super::store::TaskStore;

const STREAM_CHANNEL_SIZE: usize = 256;

/// Default request handler wiring executor, store, queues, and push
/// notifications together.
pub struct DefaultRequestHandler {
    executor: Arc<dyn AgentExecutor>,
    task_store: Arc<dyn TaskStore>,
    queue_manager: Arc<dyn QueueManager>,
    context_builder: Arc<dyn RequestContextBuilder>,
    push_config_store: Option<Arc<dyn PushNotificationConfigStore>>,
    push_sender: Option<Arc<dyn PushNotificationSender>>,
}

impl DefaultRequestHandler {
    pub fn new(executor: Arc<dyn AgentExecutor>, task_store: Arc<dyn TaskStore>) -> Self {
        Self {
            executor,
            task_store,
            queue_manager: Arc::new(InMemoryQueueManager::new()),
            context_builder: Arc::new(SimpleRequestContextBuilder::default()),
            push_config_store: None,
            push_sender: None,
        }
    }

    pub fn with_queue_manager(mut self, queue_manager: Arc<dyn QueueManager>) -> Self {
        self.queue_manager = queue_manager;
        self
    }

    pub fn with_context_builder(mut self, builder: Arc<dyn RequestContextBuilder>) -> Self {
        self.context_builder = builder;
        self
    }

    pub fn with_push_notifications(
        mut self,
        config_store: Arc<dyn PushNotificationConfigStore>,
        sender: Arc<dyn PushNotificationSender>,
    ) -> Self {
        self.push_config_store = Some(config_store);
        self.push_sender = Some(sender);
        self
    }

    /// Resolve the task a message addresses, or create a fresh one.
    ///
    /// A message naming an unknown task id is an error; so is addressing a
    /// task that already reached a terminal state. New tasks start
    /// `submitted` with the message as their first history entry.
    async fn resolve_task(&self, message: &Message) -> Result<Task, A2AError> {
        if let Some(ref task_id) = message.task_id {
            let mut task = self
                .task_store
                .get(task_id)
                .await?
                .ok_or_else(|| A2AError::task_not_found(task_id.clone()))?;

            if task.status.state.is_terminal() {
                return Err(A2AError::invalid_params(format!(
                    "task {} is in terminal state {}",
                    task_id, task.status.state
                )));
            }

            if let Some(previous) = task.status.message.take() {
                task.history.push(*previous);
            }
            task.history.push(message.clone());
            self.task_store.save(&task).await?;
            return Ok(task);
        }

        let task_id = uuid::Uuid::new_v4().to_string();
        let context_id = message
            .context_id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        let mut task = Task::new(&task_id, &context_id, TaskState::Submitted);
        let mut initial = message.clone();
        initial.task_id = Some(task_id);
        initial.context_id = Some(context_id);
        task.history.push(initial);

        self.task_store.save(&task).await?;
        debug!(task_id = %task.id, "created new task");
        Ok(task)
    }

    /// Common setup for `message/send` and `message/stream`.
    async fn setup_message_execution(
        &self,
        request: SendMessageRequest,
        call_context: Option<ServerCallContext>,
    ) -> Result<(Task, EventQueue), A2AError> {
        let task = self.resolve_task(&request.message).await?;

        // An inline push config is stored before execution starts so even
        // the first state change can be delivered.
        if let Some(config) = request
            .configuration
            .as_ref()
            .and_then(|c| c.push_notification_config.clone())
        {
            let store = self
                .push_config_store
                .as_ref()
                .ok_or(A2AError::PushNotificationNotSupported)?;
            store.set_info(&task.id, config).await?;
        }

        let context = self
            .context_builder
            .build(
                Some(request),
                task.id.clone(),
                task.context_id.clone(),
                Some(task.clone()),
                call_context,
            )
            .await?;

        let queue = self.queue_manager.create_or_tap(&task.id).await;
        self.spawn_producer(context, queue.clone(), &task);
        Ok((task, queue))
    }

    /// Run the executor on a background task.
    ///
    /// An executor failure becomes a final `failed` status event; the queue
    /// is closed and deregistered once the producer finishes.
    fn spawn_producer(&self, context: RequestContext, queue: EventQueue, task: &Task) {
        let executor = Arc::clone(&self.executor);
        let queue_manager = Arc::clone(&self.queue_manager);
        let task_id = task.id.clone();
        let context_id = task.context_id.clone();

        tokio::spawn(async move {
            if let Err(e) = executor.execute(context, queue.clone()).await {
                error!(task_id = %task_id, error = %e, "agent execution failed");
                queue
                    .enqueue(Event::StatusUpdate(TaskStatusUpdateEvent {
                        task_id: task_id.clone(),
                        context_id,
                        status: TaskStatus {
                            state: TaskState::Failed,
                            message: Some(Box::new(Message::agent(vec![Part::text(format!(
                                "Agent execution failed: {e}"
                            ))]))),
                            timestamp: Some(chrono::Utc::now().to_rfc3339()),
                        },
                        r#final: true,
                        metadata: None,
                    }))
                    .await;
            }
            // The queue may already be gone if a concurrent cancel closed it.
            if let Err(e) = queue_manager.close(&task_id).await {
                debug!(task_id = %task_id, error = %e, "queue already closed");
            }
        });
    }

    async fn notify_state_change(&self, task: &Task) {
        if let Some(ref sender) = self.push_sender {
            sender.send_notification(task).await;
        }
    }

    fn push_config_store(&self) -> Result<&Arc<dyn PushNotificationConfigStore>, A2AError> {
        self.push_config_store
            .as_ref()
            .ok_or(A2AError::PushNotificationNotSupported)
    }

    /// Keep the most recent `history_length` messages.
    fn trim_history(task: &mut Task, history_length: Option<i32>) {
        let Some(max) = history_length else { return };
        if max <= 0 {
            return;
        }
        let max = max as usize;
        if task.history.len() > max {
            let excess = task.history.len() - max;
            task.history.drain(..excess);
        }
    }
}

#[async_trait]
impl RequestHandler for DefaultRequestHandler {
    async fn on_message_send(
        &self,
        request: SendMessageRequest,
        call_context: Option<ServerCallContext>,
    ) -> Result<SendMessageResponse, A2AError> {
        let configuration = request.configuration.clone();
        let blocking = configuration.as_ref().map(|c| c.blocking).unwrap_or(false);
        let history_length = configuration.as_ref().and_then(|c| c.history_length);

        let (task, queue) = self.setup_message_execution(request, call_context).await?;
        let mut aggregator = ResultAggregator::new(Arc::clone(&self.task_store), &task.id);
        // Background consumption after an early return must still notify
        // webhooks of the remaining state changes, the terminal one included.
        if let Some(ref sender) = self.push_sender {
            aggregator = aggregator.with_push_sender(Arc::clone(sender));
        }

        let (result, _continuing) = aggregator
            .consume_and_break_on_interrupt(queue, blocking)
            .await?;

        match result {
            SendMessageResponse::Task(mut task) => {
                self.notify_state_change(&task).await;
                Self::trim_history(&mut task, history_length);
                Ok(SendMessageResponse::Task(task))
            }
            message => Ok(message),
        }
    }

    async fn on_message_send_stream(
        &self,
        request: SendMessageRequest,
        call_context: Option<ServerCallContext>,
    ) -> Result<BoxStream<'static, Result<Event, A2AError>>, A2AError> {
        let (task, queue) = self.setup_message_execution(request, call_context).await?;

        let aggregator = ResultAggregator::new(Arc::clone(&self.task_store), &task.id);
        let task_store = Arc::clone(&self.task_store);
        let push_sender = self.push_sender.clone();
        let task_id = task.id.clone();
        let (tx, rx) = mpsc::channel(STREAM_CHANNEL_SIZE);

        tokio::spawn(async move {
            while let Some(event) = queue.dequeue().await {
                if !matches!(event, Event::Message(_)) {
                    if let Err(e) = aggregator.process_event(&event).await {
                        let _ = tx.send(Err(e)).await;
                        break;
                    }
                }

                let state_changed =
                    matches!(event, Event::StatusUpdate(_) | Event::Task(_));
                if state_changed {
                    if let Some(ref sender) = push_sender {
                        if let Ok(Some(task)) = task_store.get(&task_id).await {
                            sender.send_notification(&task).await;
                        }
                    }
                }

                if tx.send(Ok(event)).await.is_err() {
                    break;
                }
            }
        });

        Ok(ReceiverStream::new(rx).boxed())
    }

    async fn on_get_task(&self, request: GetTaskRequest) -> Result<Task, A2AError> {
        let mut task = self
            .task_store
            .get(&request.id)
            .await?
            .ok_or_else(|| A2AError::task_not_found(&request.id))?;
        Self::trim_history(&mut task, request.history_length);
        Ok(task)
    }

    async fn on_cancel_task(&self, request: CancelTaskRequest) -> Result<Task, A2AError> {
        let task = self
            .task_store
            .get(&request.id)
            .await?
            .ok_or_else(|| A2AError::task_not_found(&request.id))?;

        if task.status.state.is_terminal() {
            return Err(A2AError::task_not_cancelable(&request.id));
        }

        // Attach to the live queue if the producer is still running; a fresh
        // queue otherwise, just for the cancellation events. On a tapped
        // queue the primary consumer owns persistence, so this drain must
        // not re-apply the events it observes.
        let (queue, owns_persistence) = match self.queue_manager.tap(&request.id).await {
            Some(queue) => (queue, false),
            None => (EventQueue::new(), true),
        };

        let context = self
            .context_builder
            .build(
                None,
                task.id.clone(),
                task.context_id.clone(),
                Some(task.clone()),
                None,
            )
            .await?;

        self.executor.cancel(context, queue.clone()).await?;

        let aggregator = ResultAggregator::new(Arc::clone(&self.task_store), &task.id);
        while let Some(event) = queue.dequeue().await {
            if matches!(event, Event::Message(_)) {
                continue;
            }
            // The final event is applied even on a tapped queue so the store
            // is terminal before the check below; the terminal guard makes
            // the second application by the primary consumer a no-op.
            let is_final = event.is_final();
            if owns_persistence || is_final {
                aggregator.process_event(&event).await?;
            }
            if is_final {
                break;
            }
        }

        let task = aggregator.current_task().await?;
        if task.status.state != TaskState::Canceled {
            return Err(A2AError::task_not_cancelable(&request.id));
        }

        self.notify_state_change(&task).await;
        Ok(task)
    }

    async fn on_resubscribe_to_task(
        &self,
        request: SubscribeToTaskRequest,
    ) -> Result<BoxStream<'static, Result<Event, A2AError>>, A2AError> {
        let task = self
            .task_store
            .get(&request.id)
            .await?
            .ok_or_else(|| A2AError::task_not_found(&request.id))?;

        if task.status.state.is_terminal() {
            return Err(A2AError::invalid_params(format!(
                "task {} is in terminal state {}",
                request.id, task.status.state
            )));
        }

        let queue = self
            .queue_manager
            .tap(&request.id)
            .await
            .ok_or_else(|| A2AError::task_not_found(&request.id))?;

        // Resubscribers observe raw events; the primary consumer owns
        // persistence.
        let (tx, rx) = mpsc::channel(STREAM_CHANNEL_SIZE);
        tokio::spawn(async move {
            while let Some(event) = queue.dequeue().await {
                if tx.send(Ok(event)).await.is_err() {
                    break;
                }
            }
        });

        Ok(ReceiverStream::new(rx).boxed())
    }

    async fn on_set_push_notification_config(
        &self,
        request: SetTaskPushNotificationConfigRequest,
    ) -> Result<TaskPushNotificationConfig, A2AError> {
        let store = self.push_config_store()?;

        self.task_store
            .get(&request.task_id)
            .await?
            .ok_or_else(|| A2AError::task_not_found(&request.task_id))?;

        let config = store
            .set_info(&request.task_id, request.push_notification_config)
            .await?;
        Ok(TaskPushNotificationConfig {
            task_id: request.task_id,
            push_notification_config: config,
        })
    }

    async fn on_get_push_notification_config(
        &self,
        request: GetTaskPushNotificationConfigRequest,
    ) -> Result<TaskPushNotificationConfig, A2AError> {
        let store = self.push_config_store()?;
        let configs = store.get_info(&request.task_id).await?;
        configs
            .into_iter()
            .find(|config| config.id.as_deref() == Some(request.id.as_str()))
            .map(|config| TaskPushNotificationConfig {
                task_id: request.task_id.clone(),
                push_notification_config: config,
            })
            .ok_or_else(|| {
                A2AError::task_not_found(format!("push config {} not found", request.id))
            })
    }

    async fn on_list_push_notification_configs(
        &self,
        request: ListTaskPushNotificationConfigRequest,
    ) -> Result<Vec<TaskPushNotificationConfig>, A2AError> {
        let store = self.push_config_store()?;
        let configs = store.get_info(&request.task_id).await?;
        Ok(configs
            .into_iter()
            .map(|config| TaskPushNotificationConfig {
                task_id: request.task_id.clone(),
                push_notification_config: config,
            })
            .collect())
    }

    async fn on_delete_push_notification_config(
        &self,
        request: DeleteTaskPushNotificationConfigRequest,
    ) -> Result<(), A2AError> {
        let store = self.push_config_store()?;
        store
            .delete_info(&request.task_id, request.id.as_deref())
            .await
    }
}
