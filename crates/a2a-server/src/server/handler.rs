//! Request handler trait defining the server interface.

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::A2AError;
use crate::types::config::TaskPushNotificationConfig;
use crate::types::core::Task;
use crate::types::events::Event;
use crate::types::requests::*;

use super::call_context::ServerCallContext;

/// The full server handler interface, one method per RPC.
///
/// Transports (JSON-RPC over HTTP, gRPC, ...) dispatch parsed requests to
/// these methods and assemble envelopes from the results.
#[async_trait]
pub trait RequestHandler: Send + Sync {
    /// `message/send`: run the agent and return the final Task or a direct
    /// reply Message.
    async fn on_message_send(
        &self,
        request: SendMessageRequest,
        call_context: Option<ServerCallContext>,
    ) -> Result<SendMessageResponse, A2AError>;

    /// `message/stream`: run the agent and stream its events live.
    async fn on_message_send_stream(
        &self,
        request: SendMessageRequest,
        call_context: Option<ServerCallContext>,
    ) -> Result<BoxStream<'static, Result<Event, A2AError>>, A2AError>;

    /// `tasks/get`: retrieve a stored task.
    async fn on_get_task(&self, request: GetTaskRequest) -> Result<Task, A2AError>;

    /// `tasks/cancel`: cancel a running task.
    async fn on_cancel_task(&self, request: CancelTaskRequest) -> Result<Task, A2AError>;

    /// `tasks/resubscribe`: re-attach to a running task's event stream.
    async fn on_resubscribe_to_task(
        &self,
        request: SubscribeToTaskRequest,
    ) -> Result<BoxStream<'static, Result<Event, A2AError>>, A2AError>;

    /// `tasks/pushNotificationConfig/set`.
    async fn on_set_push_notification_config(
        &self,
        request: SetTaskPushNotificationConfigRequest,
    ) -> Result<TaskPushNotificationConfig, A2AError>;

    /// `tasks/pushNotificationConfig/get`.
    async fn on_get_push_notification_config(
        &self,
        request: GetTaskPushNotificationConfigRequest,
    ) -> Result<TaskPushNotificationConfig, A2AError>;

    /// `tasks/pushNotificationConfig/list`.
    async fn on_list_push_notification_configs(
        &self,
        request: ListTaskPushNotificationConfigRequest,
    ) -> Result<Vec<TaskPushNotificationConfig>, A2AError>;

    /// `tasks/pushNotificationConfig/delete`.
    async fn on_delete_push_notification_config(
        &self,
        request: DeleteTaskPushNotificationConfigRequest,
    ) -> Result<(), A2AError>;
}
