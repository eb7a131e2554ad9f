//! Solving agent status and state
//!
//! Status is a closed enum so transitions are exhaustively checkable. The
//! state is mutated only by its owning agent loop and read concurrently by
//! status queries through an `Arc<RwLock<_>>` handle.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Agent lifecycle status
///
/// Advances monotonically except for the running⇄verifying oscillation while
/// the loop alternates between drafting and verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Pending,
    Running,
    Verifying,
    Success,
    Failed,
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AgentStatus::Pending => "pending",
            AgentStatus::Running => "running",
            AgentStatus::Verifying => "verifying",
            AgentStatus::Success => "success",
            AgentStatus::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// One timestamped log line in an agent's ordered log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub level: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Loop progress counters attached to status-update events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentProgress {
    pub current_step: String,
    pub iteration: u32,
    pub correct_count: u32,
    pub error_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Read-only snapshot of one agent for status views
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub agent_id: u32,
    pub status: AgentStatus,
    pub current_step: String,
    pub iteration: u32,
    pub correct_count: u32,
    pub error_count: u32,
}

/// Mutable state of one solving agent
#[derive(Debug, Clone)]
pub struct AgentState {
    pub agent_id: u32,
    pub status: AgentStatus,
    pub current_step: String,
    pub iteration: u32,
    pub correct_count: u32,
    pub error_count: u32,
    pub solution: Option<String>,
    pub logs: Vec<LogEntry>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl AgentState {
    pub fn new(agent_id: u32) -> Self {
        Self {
            agent_id,
            status: AgentStatus::Pending,
            current_step: String::new(),
            iteration: 0,
            correct_count: 0,
            error_count: 0,
            solution: None,
            logs: Vec::new(),
            started_at: None,
            finished_at: None,
        }
    }

    /// Record a positive verification: zero errors, bump the pass streak
    pub fn record_pass(&mut self) {
        self.correct_count += 1;
        self.error_count = 0;
    }

    /// Record a negative verification: zero the pass streak, bump errors
    pub fn record_failure(&mut self) {
        self.correct_count = 0;
        self.error_count += 1;
    }

    /// Advance the iteration counter by exactly one
    pub fn begin_iteration(&mut self) {
        self.iteration += 1;
    }

    pub fn push_log(&mut self, level: &str, message: &str) {
        self.logs.push(LogEntry {
            level: level.to_string(),
            message: message.to_string(),
            timestamp: Utc::now(),
        });
    }

    pub fn progress(&self) -> AgentProgress {
        AgentProgress {
            current_step: self.current_step.clone(),
            iteration: self.iteration,
            correct_count: self.correct_count,
            error_count: self.error_count,
            error: None,
        }
    }

    pub fn snapshot(&self) -> AgentSnapshot {
        AgentSnapshot {
            agent_id: self.agent_id,
            status: self.status,
            current_step: self.current_step.clone(),
            iteration: self.iteration,
            correct_count: self.correct_count,
            error_count: self.error_count,
        }
    }
}
