//! Protocol events produced by agent execution.

use serde::{Deserialize, Serialize};

use super::core::{Artifact, Message, Task, TaskStatus};

/// Task status change event.
///
/// `final` marks the last event of an execution run; consumers may stop
/// reading once they observe it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatusUpdateEvent {
    pub task_id: String,
    pub context_id: String,
    pub status: TaskStatus,
    #[serde(default)]
    pub r#final: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// Artifact generation/update event.
///
/// `append` extends an existing artifact's parts instead of replacing them;
/// `last_chunk` marks the end of a chunked artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskArtifactUpdateEvent {
    pub task_id: String,
    pub context_id: String,
    pub artifact: Artifact,
    #[serde(default)]
    pub append: bool,
    #[serde(default)]
    pub last_chunk: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// One unit of progress pushed by the agent executor.
///
/// Flows through the per-task `EventQueue` to every tapped subscriber and is
/// also the streaming wire payload (JSON `kind` discriminator).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Event {
    #[serde(rename = "task")]
    Task(Task),
    #[serde(rename = "message")]
    Message(Message),
    #[serde(rename = "status-update")]
    StatusUpdate(TaskStatusUpdateEvent),
    #[serde(rename = "artifact-update")]
    ArtifactUpdate(TaskArtifactUpdateEvent),
}

impl Event {
    /// The task id this event should be routed to, if it carries one.
    pub fn task_id(&self) -> Option<&str> {
        match self {
            Self::Task(task) => Some(&task.id),
            Self::Message(message) => message.task_id.as_deref(),
            Self::StatusUpdate(update) => Some(&update.task_id),
            Self::ArtifactUpdate(update) => Some(&update.task_id),
        }
    }

    /// The context id this event belongs to, if it carries one.
    pub fn context_id(&self) -> Option<&str> {
        match self {
            Self::Task(task) => Some(&task.context_id),
            Self::Message(message) => message.context_id.as_deref(),
            Self::StatusUpdate(update) => Some(&update.context_id),
            Self::ArtifactUpdate(update) => Some(&update.context_id),
        }
    }

    /// Whether this event terminates the execution run.
    pub fn is_final(&self) -> bool {
        match self {
            Self::StatusUpdate(update) => update.r#final || update.status.state.is_terminal(),
            Self::Task(task) => task.status.state.is_terminal(),
            _ => false,
        }
    }
}
