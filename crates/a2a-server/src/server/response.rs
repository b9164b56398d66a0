//! Protocol response assembly: maps handler outcomes to JSON-RPC envelopes.
//!
//! Pure data transformation: no I/O, no suspension. The per-method shape
//! check is what guarantees a misbehaving executor can never surface a
//! malformed protocol response.

use serde_json::Value;

use crate::error::A2AError;
use crate::jsonrpc::{methods, JsonRpcResponse};
use crate::types::config::TaskPushNotificationConfig;
use crate::types::core::{Message, Task};
use crate::types::events::Event;
use crate::types::requests::{ListTaskPushNotificationConfigResponse, SendMessageResponse};

/// A handler's successful outcome, before envelope assembly.
#[derive(Debug, Clone)]
pub enum HandlerResult {
    Task(Task),
    Message(Message),
    Event(Event),
    PushConfig(TaskPushNotificationConfig),
    PushConfigList(Vec<TaskPushNotificationConfig>),
    Empty,
}

impl From<SendMessageResponse> for HandlerResult {
    fn from(response: SendMessageResponse) -> Self {
        match response {
            SendMessageResponse::Task(task) => Self::Task(task),
            SendMessageResponse::Message(message) => Self::Message(message),
        }
    }
}

/// Assemble the response envelope for one method call, echoing `id`.
///
/// A success whose shape does not match the method's expected result set is
/// converted to an `InvalidAgentResponse` error envelope rather than being
/// passed through.
pub fn build_response(
    method: &str,
    id: Value,
    outcome: Result<HandlerResult, A2AError>,
) -> JsonRpcResponse {
    match outcome {
        Ok(result) => build_success_response(method, id, result),
        Err(error) => build_error_response(id, &error),
    }
}

/// Wrap an error in the shared error envelope.
pub fn build_error_response(id: Value, error: &A2AError) -> JsonRpcResponse {
    JsonRpcResponse::error(id, error.to_jsonrpc_error())
}

fn build_success_response(method: &str, id: Value, result: HandlerResult) -> JsonRpcResponse {
    let payload = match (method, result) {
        (methods::SEND_MESSAGE, HandlerResult::Task(task)) => serialize(&task),
        (methods::SEND_MESSAGE, HandlerResult::Message(message)) => serialize(&message),
        (methods::GET_TASK | methods::CANCEL_TASK, HandlerResult::Task(task)) => serialize(&task),
        (methods::SEND_STREAM | methods::RESUBSCRIBE_TASK, HandlerResult::Event(event)) => {
            serialize(&event)
        }
        (
            methods::SET_PUSH_CONFIG | methods::GET_PUSH_CONFIG,
            HandlerResult::PushConfig(config),
        ) => serialize(&config),
        (methods::LIST_PUSH_CONFIG, HandlerResult::PushConfigList(configs)) => {
            serialize(&ListTaskPushNotificationConfigResponse { configs })
        }
        (methods::DELETE_PUSH_CONFIG, HandlerResult::Empty) => Ok(Value::Null),
        (method, unexpected) => {
            // The result shape does not belong to this method.
            return build_error_response(
                id,
                &A2AError::invalid_agent_response(format!(
                    "unexpected result {} for method {method}",
                    variant_name(&unexpected)
                )),
            );
        }
    };

    match payload {
        Ok(value) => JsonRpcResponse::success(id, value),
        Err(error) => build_error_response(id, &error),
    }
}

fn serialize<T: serde::Serialize>(value: &T) -> Result<Value, A2AError> {
    serde_json::to_value(value).map_err(|e| A2AError::internal_error(e.to_string()))
}

fn variant_name(result: &HandlerResult) -> &'static str {
    match result {
        HandlerResult::Task(_) => "Task",
        HandlerResult::Message(_) => "Message",
        HandlerResult::Event(_) => "Event",
        HandlerResult::PushConfig(_) => "PushConfig",
        HandlerResult::PushConfigList(_) => "PushConfigList",
        HandlerResult::Empty => "Empty",
    }
}
