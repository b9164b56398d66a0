//! Per-call request context and its builder.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::A2AError;
use crate::types::core::{Message, Task};
use crate::types::requests::SendMessageRequest;

use super::call_context::ServerCallContext;
use super::store::TaskStore;

/// The ephemeral bundle of inputs handed to the agent executor for one call.
///
/// Built once per inbound request and never persisted. `related_tasks` is
/// `None` when the builder was not configured to resolve referenced tasks.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub message: Option<Message>,
    pub configuration: Option<crate::types::config::SendMessageConfiguration>,
    pub task_id: String,
    pub context_id: String,
    pub task: Option<Task>,
    pub related_tasks: Option<Vec<Task>>,
    pub call_context: Option<ServerCallContext>,
    pub metadata: Option<serde_json::Value>,
}

/// Assembles the [`RequestContext`] for one inbound call.
#[async_trait]
pub trait RequestContextBuilder: Send + Sync {
    async fn build(
        &self,
        request: Option<SendMessageRequest>,
        task_id: String,
        context_id: String,
        task: Option<Task>,
        call_context: Option<ServerCallContext>,
    ) -> Result<RequestContext, A2AError>;
}

/// Default builder.
///
/// When `should_populate_referred_tasks` is set, every id in the message's
/// `reference_task_ids` is resolved against the task store concurrently and
/// dangling references are dropped. Leaving it unset skips the store calls
/// entirely, trading context richness for latency.
pub struct SimpleRequestContextBuilder {
    should_populate_referred_tasks: bool,
    task_store: Option<Arc<dyn TaskStore>>,
}

impl SimpleRequestContextBuilder {
    pub fn new(
        should_populate_referred_tasks: bool,
        task_store: Option<Arc<dyn TaskStore>>,
    ) -> Self {
        Self {
            should_populate_referred_tasks,
            task_store,
        }
    }
}

impl Default for SimpleRequestContextBuilder {
    fn default() -> Self {
        Self::new(false, None)
    }
}

#[async_trait]
impl RequestContextBuilder for SimpleRequestContextBuilder {
    async fn build(
        &self,
        request: Option<SendMessageRequest>,
        task_id: String,
        context_id: String,
        task: Option<Task>,
        call_context: Option<ServerCallContext>,
    ) -> Result<RequestContext, A2AError> {
        let (mut message, configuration, metadata) = match request {
            Some(request) => (
                Some(request.message),
                request.configuration,
                request.metadata,
            ),
            None => (None, None, None),
        };

        // Write the resolved ids back into the message so the executor and
        // every downstream event agree on them.
        if let Some(ref mut message) = message {
            message.task_id = Some(task_id.clone());
            message.context_id = Some(context_id.clone());
        }

        let related_tasks = match (&self.task_store, &message) {
            (Some(store), Some(message))
                if self.should_populate_referred_tasks
                    && !message.reference_task_ids.is_empty() =>
            {
                let lookups = message
                    .reference_task_ids
                    .iter()
                    .map(|id| store.get(id));
                let resolved = futures::future::join_all(lookups).await;
                // Dangling references are dropped, not an error.
                Some(
                    resolved
                        .into_iter()
                        .filter_map(|result| result.ok().flatten())
                        .collect(),
                )
            }
            _ => None,
        };

        Ok(RequestContext {
            message,
            configuration,
            task_id,
            context_id,
            task,
            related_tasks,
            call_context,
            metadata,
        })
    }
}
