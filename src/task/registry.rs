//! TaskRegistry - actor that owns the in-memory task map
//!
//! Processes commands via channels for thread-safe access to task state. The
//! actor is the single owner of every task record, which makes the winner
//! check-and-set atomic: only the first recording succeeds, regardless of how
//! agents race to completion.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::Utc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::agent::{AgentState, AgentStatus};

use super::messages::{RegistryCommand, RegistryError};
use super::types::{RegistryMetrics, SolutionView, SolveTask, TaskRunStatus, TaskStatusView};

/// Handle to send commands to the registry actor
#[derive(Clone)]
pub struct TaskRegistry {
    tx: mpsc::Sender<RegistryCommand>,
}

impl TaskRegistry {
    /// Spawn a new registry actor
    pub fn spawn() -> Self {
        debug!("TaskRegistry::spawn: called");
        let (tx, rx) = mpsc::channel(256);
        tokio::spawn(actor_loop(rx));
        info!("TaskRegistry spawned");
        Self { tx }
    }

    async fn send<R>(
        &self,
        make: impl FnOnce(oneshot::Sender<R>) -> RegistryCommand,
    ) -> Result<R, RegistryError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx.send(make(reply_tx)).await.map_err(|_| RegistryError::Closed)?;
        reply_rx.await.map_err(|_| RegistryError::Closed)
    }

    /// Register a new task
    pub async fn create(&self, task: SolveTask) -> Result<(), RegistryError> {
        debug!(task_id = %task.id, "create: called");
        self.send(|reply| RegistryCommand::Create { task, reply }).await?
    }

    /// Full record clone, for the orchestrator only (carries the credential)
    pub async fn fetch(&self, task_id: &str) -> Result<Option<SolveTask>, RegistryError> {
        debug!(%task_id, "fetch: called");
        self.send(|reply| RegistryCommand::Fetch {
            task_id: task_id.to_string(),
            reply,
        })
        .await
    }

    /// Externally exposed status view
    pub async fn status(&self, task_id: &str) -> Result<Option<TaskStatusView>, RegistryError> {
        debug!(%task_id, "status: called");
        self.send(|reply| RegistryCommand::Status {
            task_id: task_id.to_string(),
            reply,
        })
        .await
    }

    /// Externally exposed solution view
    pub async fn solution(&self, task_id: &str) -> Result<SolutionView, RegistryError> {
        debug!(%task_id, "solution: called");
        self.send(|reply| RegistryCommand::Solution {
            task_id: task_id.to_string(),
            reply,
        })
        .await?
    }

    /// Status views for every known task
    pub async fn list(&self) -> Result<Vec<TaskStatusView>, RegistryError> {
        debug!("list: called");
        self.send(|reply| RegistryCommand::List { reply }).await
    }

    /// Attach one agent's shared state handle to its task
    pub async fn attach_agent(
        &self,
        task_id: &str,
        agent_id: u32,
        state: Arc<RwLock<AgentState>>,
    ) -> Result<(), RegistryError> {
        debug!(%task_id, agent_id, "attach_agent: called");
        self.send(|reply| RegistryCommand::AttachAgent {
            task_id: task_id.to_string(),
            agent_id,
            state,
            reply,
        })
        .await?
    }

    /// Transition the task to running
    pub async fn mark_running(&self, task_id: &str) -> Result<(), RegistryError> {
        debug!(%task_id, "mark_running: called");
        self.send(|reply| RegistryCommand::MarkRunning {
            task_id: task_id.to_string(),
            reply,
        })
        .await?
    }

    /// Record the winning solution; Ok(true) only for the first call
    pub async fn record_winner(
        &self,
        task_id: &str,
        agent_id: u32,
        solution: String,
    ) -> Result<bool, RegistryError> {
        debug!(%task_id, agent_id, "record_winner: called");
        self.send(|reply| RegistryCommand::RecordWinner {
            task_id: task_id.to_string(),
            agent_id,
            solution,
            reply,
        })
        .await?
    }

    /// Transition the task to completed
    pub async fn mark_completed(&self, task_id: &str) -> Result<(), RegistryError> {
        debug!(%task_id, "mark_completed: called");
        self.send(|reply| RegistryCommand::MarkCompleted {
            task_id: task_id.to_string(),
            reply,
        })
        .await?
    }

    /// Delete a task; fails with a conflict while the task is running
    pub async fn delete(&self, task_id: &str) -> Result<(), RegistryError> {
        debug!(%task_id, "delete: called");
        self.send(|reply| RegistryCommand::Delete {
            task_id: task_id.to_string(),
            reply,
        })
        .await?
    }

    /// Aggregated metrics over all tasks
    pub async fn metrics(&self) -> Result<RegistryMetrics, RegistryError> {
        debug!("metrics: called");
        self.send(|reply| RegistryCommand::Metrics { reply }).await
    }
}

/// The actor: single owner of the task map
async fn actor_loop(mut rx: mpsc::Receiver<RegistryCommand>) {
    debug!("actor_loop: starting");
    let mut tasks: HashMap<String, SolveTask> = HashMap::new();

    while let Some(command) = rx.recv().await {
        match command {
            RegistryCommand::Create { task, reply } => {
                debug!(task_id = %task.id, "actor_loop: Create");
                tasks.insert(task.id.clone(), task);
                let _ = reply.send(Ok(()));
            }
            RegistryCommand::Fetch { task_id, reply } => {
                let _ = reply.send(tasks.get(&task_id).cloned());
            }
            RegistryCommand::Status { task_id, reply } => {
                let _ = reply.send(tasks.get(&task_id).map(SolveTask::status_view));
            }
            RegistryCommand::Solution { task_id, reply } => {
                let result = tasks
                    .get(&task_id)
                    .map(SolveTask::solution_view)
                    .ok_or(RegistryError::NotFound(task_id));
                let _ = reply.send(result);
            }
            RegistryCommand::List { reply } => {
                let _ = reply.send(tasks.values().map(SolveTask::status_view).collect());
            }
            RegistryCommand::AttachAgent {
                task_id,
                agent_id,
                state,
                reply,
            } => {
                let result = match tasks.get_mut(&task_id) {
                    Some(task) => {
                        task.agents.insert(agent_id, state);
                        Ok(())
                    }
                    None => Err(RegistryError::NotFound(task_id)),
                };
                let _ = reply.send(result);
            }
            RegistryCommand::MarkRunning { task_id, reply } => {
                let result = match tasks.get_mut(&task_id) {
                    Some(task) => {
                        task.run_status = TaskRunStatus::Running;
                        task.started_at = Some(Utc::now());
                        Ok(())
                    }
                    None => Err(RegistryError::NotFound(task_id)),
                };
                let _ = reply.send(result);
            }
            RegistryCommand::RecordWinner {
                task_id,
                agent_id,
                solution,
                reply,
            } => {
                let result = match tasks.get_mut(&task_id) {
                    Some(task) => {
                        if task.solution_found {
                            debug!(%task_id, agent_id, "actor_loop: winner already recorded, ignoring");
                            Ok(false)
                        } else {
                            info!(%task_id, agent_id, "recording winning solution");
                            task.solution_found = true;
                            task.solution_agent_id = Some(agent_id);
                            task.solution = Some(solution);
                            Ok(true)
                        }
                    }
                    None => {
                        warn!(%task_id, agent_id, "actor_loop: RecordWinner for unknown task");
                        Err(RegistryError::NotFound(task_id))
                    }
                };
                let _ = reply.send(result);
            }
            RegistryCommand::MarkCompleted { task_id, reply } => {
                let result = match tasks.get_mut(&task_id) {
                    Some(task) => {
                        task.run_status = TaskRunStatus::Completed;
                        task.finished_at = Some(Utc::now());
                        Ok(())
                    }
                    None => Err(RegistryError::NotFound(task_id)),
                };
                let _ = reply.send(result);
            }
            RegistryCommand::Delete { task_id, reply } => {
                let result = match tasks.get(&task_id) {
                    Some(task) if task.run_status == TaskRunStatus::Running => {
                        debug!(%task_id, "actor_loop: refusing to delete running task");
                        Err(RegistryError::TaskRunning(task_id))
                    }
                    Some(_) => {
                        tasks.remove(&task_id);
                        info!(%task_id, "task deleted");
                        Ok(())
                    }
                    None => Err(RegistryError::NotFound(task_id)),
                };
                let _ = reply.send(result);
            }
            RegistryCommand::Metrics { reply } => {
                let mut metrics = RegistryMetrics {
                    total_tasks: tasks.len() as u64,
                    ..Default::default()
                };
                for task in tasks.values() {
                    match task.run_status {
                        TaskRunStatus::Running => metrics.running_tasks += 1,
                        TaskRunStatus::Completed => metrics.completed_tasks += 1,
                        TaskRunStatus::Pending => {}
                    }
                    for state in task.agents.values() {
                        let status = state.read().expect("agent state lock poisoned").status;
                        if status == AgentStatus::Running {
                            metrics.running_agents += 1;
                        }
                    }
                }
                let _ = reply.send(metrics);
            }
        }
    }

    debug!("actor_loop: channel closed, shutting down");
}
