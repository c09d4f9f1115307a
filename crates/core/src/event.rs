//! Domain event system — decoupled observation of the chat pipeline.
//!
//! The pipeline and dispatcher publish events as turns and tasks progress.
//! Anything that wants to watch (the CLI, tests) subscribes and filters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::action::TaskStatus;
use crate::command::Verb;

/// All domain events in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    /// An operator request passed the prefix filter
    RequestAccepted {
        sender: String,
        request_preview: String,
        timestamp: DateTime<Utc>,
    },

    /// The model replied
    InferenceCompleted {
        commands: usize,
        rejected_lines: usize,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// The completion round-trip failed; no batch was produced
    InferenceFailed {
        error_message: String,
        timestamp: DateTime<Utc>,
    },

    /// A reply line did not parse
    CommandRejected {
        line: String,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// An action task moved to a new status
    TaskStatusChanged {
        task_id: Uuid,
        verb: Verb,
        status: TaskStatus,
        timestamp: DateTime<Utc>,
    },
}

/// A broadcast-based event bus for domain events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
pub struct EventBus {
    sender: broadcast::Sender<Arc<DomainEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: DomainEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
