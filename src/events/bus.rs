//! Event bus - fire-and-forget fan-out to outward transports
//!
//! Agents and the orchestrator push into a bounded broadcast channel; the
//! transports (WebSocket bridge, log writer, CLI printer) subscribe. A full
//! or subscriber-less channel drops events rather than blocking the solving
//! loop.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::debug;

use crate::agent::{AgentProgress, AgentStatus};
use crate::task::RunStats;

use super::types::TaskEvent;

/// Default channel capacity (events)
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Central event bus for task activity streaming
pub struct EventBus {
    tx: broadcast::Sender<TaskEvent>,
}

impl EventBus {
    /// Create a new event bus with the given capacity
    pub fn new(capacity: usize) -> Self {
        debug!(capacity, "EventBus::new: creating event bus");
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Create a new event bus with default capacity
    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Emit an event to all subscribers
    ///
    /// Fire-and-forget: with no subscribers the event is dropped.
    pub fn emit(&self, event: TaskEvent) {
        debug!(event_type = event.event_type(), task_id = event.task_id(), "EventBus::emit");
        let _ = self.tx.send(event);
    }

    /// Subscribe to receive events emitted after this point
    pub fn subscribe(&self) -> broadcast::Receiver<TaskEvent> {
        debug!("EventBus::subscribe: new subscriber");
        self.tx.subscribe()
    }

    /// Create a sink handle bound to one task
    pub fn sink_for(&self, task_id: impl Into<String>) -> EventSink {
        let task_id = task_id.into();
        debug!(%task_id, "EventBus::sink_for: creating sink");
        EventSink {
            tx: self.tx.clone(),
            task_id,
        }
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

/// Create an event bus wrapped in an Arc for shared ownership
pub fn create_event_bus() -> Arc<EventBus> {
    Arc::new(EventBus::with_default_capacity())
}

/// Per-task emitter handed to agents and the orchestrator
///
/// Cheap to clone; every send is best-effort and never fails the caller.
#[derive(Clone)]
pub struct EventSink {
    tx: broadcast::Sender<TaskEvent>,
    task_id: String,
}

impl EventSink {
    /// Get the task ID this sink is bound to
    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    /// Emit a raw event
    pub fn emit(&self, event: TaskEvent) {
        debug!(event_type = event.event_type(), "EventSink::emit");
        let _ = self.tx.send(event);
    }

    /// Mirror one agent log line
    pub fn log(&self, agent_id: u32, level: &str, message: &str) {
        self.emit(TaskEvent::Log {
            task_id: self.task_id.clone(),
            agent_id,
            level: level.to_string(),
            message: message.to_string(),
        });
    }

    /// Mirror an agent status transition
    pub fn agent_update(&self, agent_id: u32, status: AgentStatus, data: AgentProgress) {
        self.emit(TaskEvent::AgentUpdate {
            task_id: self.task_id.clone(),
            agent_id,
            status,
            data,
        });
    }

    /// Announce a verified solution
    pub fn solution_found(&self, agent_id: u32, solution: &str) {
        self.emit(TaskEvent::SolutionFound {
            task_id: self.task_id.clone(),
            agent_id,
            solution: solution.to_string(),
        });
    }

    /// Announce task completion with aggregated statistics
    pub fn task_complete(&self, stats: RunStats) {
        self.emit(TaskEvent::TaskComplete {
            task_id: self.task_id.clone(),
            stats,
        });
    }
}
