use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_with::skip_serializing_none;
use tokio::sync::broadcast;

use super::Action;

const DEFAULT_CAPACITY: usize = 64;

/// Which side of an action an event was emitted from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Before,
    After,
}

/// Lifecycle notification published by a controller
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerEvent {
    /// Model name of the emitting resource
    pub resource: String,
    pub action: Action,
    pub phase: Phase,
    /// Payload for `before` events of writes, the resulting data for `after`
    pub data: Option<Value>,
}

/// Fan-out channel for controller events.
///
/// Emitting never waits on subscribers and never fails: with nobody
/// listening the event is dropped, and slow subscribers see
/// `RecvError::Lagged` instead of holding up requests.
#[derive(Debug, Clone)]
pub struct EventEmitter {
    sender: broadcast::Sender<ControllerEvent>,
}

impl EventEmitter {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ControllerEvent> {
        self.sender.subscribe()
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    pub fn emit(&self, event: ControllerEvent) {
        if self.sender.receiver_count() == 0 {
            return;
        }
        if let Err(e) = self.sender.send(event) {
            tracing::trace!(action = %e.0.action, "event dropped, no subscribers");
        }
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
