//! Lifecycle event bus
//!
//! Every successful transition is announced on a `tokio::sync::broadcast`
//! channel. Emitting never blocks: with no subscribers the event is dropped,
//! and a lagging subscriber loses the oldest events rather than slowing the
//! manager down.
//!
//! # Example
//!
//! ```no_run
//! use libpostdeck::service::events::{EventBus, LifecycleEvent};
//!
//! # async fn example() {
//! let event_bus = EventBus::new(100);
//! let mut receiver = event_bus.subscribe();
//!
//! event_bus.emit(LifecycleEvent::Approved { post_id: 1 });
//!
//! if let Ok(event) = receiver.recv().await {
//!     println!("Received: {:?}", event);
//! }
//! # }
//! ```

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

pub type EventReceiver = broadcast::Receiver<LifecycleEvent>;

#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<LifecycleEvent>,
}

impl EventBus {
    /// `capacity` is the per-subscriber buffer before lagging kicks in
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> EventReceiver {
        self.sender.subscribe()
    }

    pub fn emit(&self, event: LifecycleEvent) {
        // Err only means nobody is listening
        let _ = self.sender.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(100)
    }
}

/// Transitions announced by the lifecycle manager
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LifecycleEvent {
    Created { post_id: i64, status: String },
    Edited { post_id: i64 },
    Submitted { post_id: i64 },
    Approved { post_id: i64 },
    Rejected { post_id: i64 },
    Published {
        post_id: i64,
        publisher: String,
        remote_id: Option<String>,
    },
    Queued {
        post_id: i64,
        publisher: String,
        location: String,
    },
    DryRun { post_id: i64, publisher: String },
    PublishFailed {
        post_id: i64,
        publisher: String,
        error: String,
    },
    Deleted { post_id: i64 },
}

impl LifecycleEvent {
    pub fn post_id(&self) -> i64 {
        match self {
            LifecycleEvent::Created { post_id, .. }
            | LifecycleEvent::Edited { post_id }
            | LifecycleEvent::Submitted { post_id }
            | LifecycleEvent::Approved { post_id }
            | LifecycleEvent::Rejected { post_id }
            | LifecycleEvent::Published { post_id, .. }
            | LifecycleEvent::Queued { post_id, .. }
            | LifecycleEvent::DryRun { post_id, .. }
            | LifecycleEvent::PublishFailed { post_id, .. }
            | LifecycleEvent::Deleted { post_id } => *post_id,
        }
    }
}
