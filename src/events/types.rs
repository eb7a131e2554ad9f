//! Event types mirrored to the outward transport
//!
//! The serde tags are the wire names the push transport expects:
//! `log`, `agent_update`, `solution_found`, `task_complete`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::agent::{AgentProgress, AgentStatus};
use crate::task::RunStats;

/// One observable event in a task's lifetime
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaskEvent {
    /// A log line from one agent
    Log {
        task_id: String,
        agent_id: u32,
        level: String,
        message: String,
    },
    /// An agent status transition with its loop counters
    AgentUpdate {
        task_id: String,
        agent_id: u32,
        status: AgentStatus,
        data: AgentProgress,
    },
    /// An agent produced a verified solution
    SolutionFound {
        task_id: String,
        agent_id: u32,
        solution: String,
    },
    /// The whole task finished, with aggregated statistics
    TaskComplete { task_id: String, stats: RunStats },
}

impl TaskEvent {
    /// Get the task ID for this event
    pub fn task_id(&self) -> &str {
        match self {
            TaskEvent::Log { task_id, .. }
            | TaskEvent::AgentUpdate { task_id, .. }
            | TaskEvent::SolutionFound { task_id, .. }
            | TaskEvent::TaskComplete { task_id, .. } => task_id,
        }
    }

    /// Get the wire name of the event type
    pub fn event_type(&self) -> &'static str {
        match self {
            TaskEvent::Log { .. } => "log",
            TaskEvent::AgentUpdate { .. } => "agent_update",
            TaskEvent::SolutionFound { .. } => "solution_found",
            TaskEvent::TaskComplete { .. } => "task_complete",
        }
    }
}

/// A timestamped event entry, the shape written to line-oriented outputs
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EventLogEntry {
    #[serde(rename = "ts")]
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub event: TaskEvent,
}

impl EventLogEntry {
    /// Create a new entry with the current timestamp
    pub fn new(event: TaskEvent) -> Self {
        Self {
            timestamp: Utc::now(),
            event,
        }
    }
}
