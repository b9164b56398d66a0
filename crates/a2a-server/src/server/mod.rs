//! Server-side substrate: queues, stores, context building, execution,
//! aggregation, and response assembly.

pub mod call_context;
pub mod context;
pub mod event_queue;
pub mod executor;
pub mod handler;
pub mod push_notification;
pub mod queue_manager;
pub mod request_handler;
pub mod response;
pub mod result_aggregator;
pub mod store;

pub use call_context::{ServerCallContext, User};
pub use context::{RequestContext, RequestContextBuilder, SimpleRequestContextBuilder};
pub use event_queue::EventQueue;
pub use executor::AgentExecutor;
pub use handler::RequestHandler;
pub use push_notification::{
    BasePushNotificationSender, InMemoryPushNotificationConfigStore, PushNotificationConfigStore,
    PushNotificationSender,
};
pub use queue_manager::{InMemoryQueueManager, QueueError, QueueManager};
pub use request_handler::DefaultRequestHandler;
pub use response::{build_error_response, build_response, HandlerResult};
pub use result_aggregator::ResultAggregator;
pub use store::{InMemoryTaskStore, TaskStore};
