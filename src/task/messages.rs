//! Command and error types for the task registry actor

use std::sync::{Arc, RwLock};

use thiserror::Error;
use tokio::sync::oneshot;

use crate::agent::AgentState;

use super::types::{RegistryMetrics, SolutionView, SolveTask, TaskStatusView};

/// Errors surfaced by registry operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("task not found: {0}")]
    NotFound(String),

    #[error("cannot delete running task: {0}")]
    TaskRunning(String),

    #[error("registry channel closed")]
    Closed,
}

/// Commands processed by the registry actor
pub enum RegistryCommand {
    Create {
        task: SolveTask,
        reply: oneshot::Sender<Result<(), RegistryError>>,
    },
    /// Full record clone for the orchestrator (carries the credential)
    Fetch {
        task_id: String,
        reply: oneshot::Sender<Option<SolveTask>>,
    },
    Status {
        task_id: String,
        reply: oneshot::Sender<Option<TaskStatusView>>,
    },
    Solution {
        task_id: String,
        reply: oneshot::Sender<Result<SolutionView, RegistryError>>,
    },
    List {
        reply: oneshot::Sender<Vec<TaskStatusView>>,
    },
    AttachAgent {
        task_id: String,
        agent_id: u32,
        state: Arc<RwLock<AgentState>>,
        reply: oneshot::Sender<Result<(), RegistryError>>,
    },
    MarkRunning {
        task_id: String,
        reply: oneshot::Sender<Result<(), RegistryError>>,
    },
    /// Atomic check-and-set: Ok(true) only for the first recording
    RecordWinner {
        task_id: String,
        agent_id: u32,
        solution: String,
        reply: oneshot::Sender<Result<bool, RegistryError>>,
    },
    MarkCompleted {
        task_id: String,
        reply: oneshot::Sender<Result<(), RegistryError>>,
    },
    Delete {
        task_id: String,
        reply: oneshot::Sender<Result<(), RegistryError>>,
    },
    Metrics {
        reply: oneshot::Sender<RegistryMetrics>,
    },
}
