//! A2A (Agent-to-Agent) protocol server substrate.
//!
//! Implements the task/event delivery core of an A2A server: per-task event
//! queues with multicast tap semantics, queue lifecycle management, task
//! persistence, push-notification fan-out, and JSON-RPC envelope assembly.
//! Agent business logic plugs in through the [`server::executor::AgentExecutor`]
//! trait; transport wiring is left to the embedding application.

pub mod error;
pub mod jsonrpc;
pub mod server;
pub mod types;

pub use error::A2AError;
pub use types::*;
