//! Per-task multicast event queue with tap semantics.
//!
//! A root queue is created when a task's first request arrives. `tap` derives
//! child queues that receive every event enqueued from that point forward,
//! which is what backs `message/stream` resubscription. Channels are
//! unbounded, so a slow consumer never blocks the producer.

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tracing::warn;

use crate::types::events::Event;

struct Shared {
    // One sender per live consumer (the root plus every tap). All senders are
    // fed inside a single critical section, so every consumer observes events
    // in the same order.
    senders: Vec<mpsc::UnboundedSender<Event>>,
    closed: bool,
}

/// Multicast event channel for a single task.
///
/// Cloning yields another handle to the same consumer; use [`EventQueue::tap`]
/// for an independent subscriber.
#[derive(Clone)]
pub struct EventQueue {
    shared: Arc<Mutex<Shared>>,
    receiver: Arc<Mutex<mpsc::UnboundedReceiver<Event>>>,
}

impl EventQueue {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            shared: Arc::new(Mutex::new(Shared {
                senders: vec![tx],
                closed: false,
            })),
            receiver: Arc::new(Mutex::new(rx)),
        }
    }

    /// Deliver an event to this queue and every live tap.
    ///
    /// After `close` this is a logged no-op: a late executor event after
    /// cancellation or completion must not crash the producer.
    pub async fn enqueue(&self, event: Event) {
        let mut shared = self.shared.lock().await;
        if shared.closed {
            warn!(task_id = ?event.task_id(), "event enqueued after close, dropping");
            return;
        }
        // A send failure means that consumer's receiver is gone; prune its
        // sender so abandoned taps stop costing a clone per event.
        shared
            .senders
            .retain(|sender| sender.send(event.clone()).is_ok());
    }

    /// Wait for the next event.
    ///
    /// Returns `None` once the queue has been closed and this consumer has
    /// drained its buffer (end-of-stream, not an error).
    pub async fn dequeue(&self) -> Option<Event> {
        let mut receiver = self.receiver.lock().await;
        receiver.recv().await
    }

    /// Derive a subscriber queue that receives every event enqueued from this
    /// point forward. History is not replayed.
    ///
    /// Tapping a closed queue returns a queue that is already at
    /// end-of-stream.
    pub async fn tap(&self) -> EventQueue {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut shared = self.shared.lock().await;
        if !shared.closed {
            shared.senders.push(tx);
        }
        EventQueue {
            shared: Arc::clone(&self.shared),
            receiver: Arc::new(Mutex::new(rx)),
        }
    }

    /// Close the queue and every tap. Idempotent.
    ///
    /// Consumers still drain their buffered events before reaching
    /// end-of-stream.
    pub async fn close(&self) {
        let mut shared = self.shared.lock().await;
        shared.closed = true;
        // Dropping the senders lets each receiver drain and then end.
        shared.senders.clear();
    }

    pub async fn is_closed(&self) -> bool {
        self.shared.lock().await.closed
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}
