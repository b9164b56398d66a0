//! Agent executor trait, the seam where agent business logic plugs in.

use async_trait::async_trait;

use crate::error::A2AError;

use super::context::RequestContext;
use super::event_queue::EventQueue;

/// Trait for agent execution logic.
///
/// Implementors receive a [`RequestContext`] and push progress events into
/// the supplied [`EventQueue`]. The executor runs on a background task; the
/// request handler consumes the queue.
#[async_trait]
pub trait AgentExecutor: Send + Sync {
    /// Execute the agent logic for the given request context.
    async fn execute(&self, context: RequestContext, queue: EventQueue) -> Result<(), A2AError>;

    /// Cancel an in-progress task. Implementors should enqueue a `canceled`
    /// status event once cancellation has taken effect.
    async fn cancel(&self, context: RequestContext, queue: EventQueue) -> Result<(), A2AError>;
}
