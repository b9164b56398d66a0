//! Request and response payload types for the server's RPC surface.

use serde::{Deserialize, Serialize};

use super::config::{
    PushNotificationConfig, SendMessageConfiguration, TaskPushNotificationConfig,
};
use super::core::{Message, Task};

/// `message/send` and `message/stream` parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub message: Message,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub configuration: Option<SendMessageConfiguration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// `tasks/get` parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetTaskRequest {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history_length: Option<i32>,
}

/// `tasks/cancel` parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelTaskRequest {
    pub id: String,
}

/// `tasks/resubscribe` parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeToTaskRequest {
    pub id: String,
}

/// `tasks/pushNotificationConfig/set` parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetTaskPushNotificationConfigRequest {
    pub task_id: String,
    pub push_notification_config: PushNotificationConfig,
}

/// `tasks/pushNotificationConfig/get` parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetTaskPushNotificationConfigRequest {
    pub task_id: String,
    pub id: String,
}

/// `tasks/pushNotificationConfig/delete` parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteTaskPushNotificationConfigRequest {
    pub task_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// `tasks/pushNotificationConfig/list` parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListTaskPushNotificationConfigRequest {
    pub task_id: String,
}

/// `message/send` result: either the tracked Task or a direct agent reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SendMessageResponse {
    Task(Task),
    Message(Message),
}

/// `tasks/pushNotificationConfig/list` result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListTaskPushNotificationConfigResponse {
    pub configs: Vec<TaskPushNotificationConfig>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::core::{Part, TaskState};

    #[test]
    fn test_send_message_request_serde() {
        let request = SendMessageRequest {
            message: Message::user(vec![Part::text("Hello")]),
            configuration: Some(SendMessageConfiguration {
                blocking: true,
                ..Default::default()
            }),
            metadata: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["message"]["role"], "user");
        assert_eq!(json["configuration"]["blocking"], true);
    }

    #[test]
    fn test_send_message_response_task() {
        let task = Task::new("task-1", "ctx-1", TaskState::Completed);
        let response = SendMessageResponse::Task(task);
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["id"], "task-1");
        assert_eq!(json["status"]["state"], "completed");
    }

    #[test]
    fn test_send_message_response_message() {
        let msg = Message::agent(vec![Part::text("Hi")]);
        let response = SendMessageResponse::Message(msg);
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["role"], "agent");
    }

    #[test]
    fn test_delete_push_config_request_optional_id() {
        let request: DeleteTaskPushNotificationConfigRequest =
            serde_json::from_value(serde_json::json!({"taskId": "t1"})).unwrap();
        assert_eq!(request.task_id, "t1");
        assert!(request.id.is_none());
    }
}
