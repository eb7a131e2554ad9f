//! Task records, status views, and run statistics

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::agent::{AgentSnapshot, AgentState};

/// Task run lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskRunStatus {
    Pending,
    Running,
    Completed,
}

/// Everything the caller supplies to start a solve run
#[derive(Debug, Clone)]
pub struct TaskParams {
    pub problem_statement: String,
    pub num_agents: u32,
    pub model: String,
    pub api_key: String,
    pub other_prompts: Vec<String>,
    pub timeout: Option<Duration>,
    pub max_iterations: u32,
}

/// One solve task: immutable inputs plus run state
///
/// Owned by the registry actor; mutated only through registry commands issued
/// by the orchestrator. Agent states are shared handles mutated by their
/// owning loops and read here for status views.
#[derive(Debug, Clone)]
pub struct SolveTask {
    pub id: String,
    pub problem_statement: String,
    pub num_agents: u32,
    pub model: String,
    pub api_key: String,
    pub other_prompts: Vec<String>,
    pub timeout: Option<Duration>,
    pub max_iterations: u32,
    pub agents: HashMap<u32, Arc<RwLock<AgentState>>>,
    pub run_status: TaskRunStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub solution_found: bool,
    pub solution_agent_id: Option<u32>,
    pub solution: Option<String>,
}

impl SolveTask {
    pub fn new(id: impl Into<String>, params: TaskParams) -> Self {
        let id = id.into();
        debug!(%id, num_agents = params.num_agents, model = %params.model, "SolveTask::new: called");
        Self {
            id,
            problem_statement: params.problem_statement,
            num_agents: params.num_agents,
            model: params.model,
            api_key: params.api_key,
            other_prompts: params.other_prompts,
            timeout: params.timeout,
            max_iterations: params.max_iterations,
            agents: HashMap::new(),
            run_status: TaskRunStatus::Pending,
            started_at: None,
            finished_at: None,
            solution_found: false,
            solution_agent_id: None,
            solution: None,
        }
    }

    /// Elapsed wall-clock seconds, frozen once the task finishes
    pub fn elapsed_secs(&self) -> f64 {
        match self.started_at {
            Some(start) => {
                let end = self.finished_at.unwrap_or_else(Utc::now);
                (end - start).num_milliseconds() as f64 / 1000.0
            }
            None => 0.0,
        }
    }

    /// Build the externally exposed status view
    pub fn status_view(&self) -> TaskStatusView {
        let mut agent_ids: Vec<u32> = self.agents.keys().copied().collect();
        agent_ids.sort_unstable();

        let agents = agent_ids
            .into_iter()
            .filter_map(|id| {
                self.agents
                    .get(&id)
                    .map(|state| state.read().expect("agent state lock poisoned").snapshot())
            })
            .collect();

        TaskStatusView {
            task_id: self.id.clone(),
            status: self.run_status,
            num_agents: self.num_agents,
            model: self.model.clone(),
            solution_found: self.solution_found,
            solution_agent_id: self.solution_agent_id,
            agents,
            started_at: self.started_at,
            elapsed_secs: self.elapsed_secs(),
        }
    }

    /// Build the solution view
    pub fn solution_view(&self) -> SolutionView {
        SolutionView {
            solution_found: self.solution_found,
            solution_agent_id: self.solution_agent_id,
            solution: self.solution.clone(),
            execution_time_secs: self.finished_at.map(|_| self.elapsed_secs()),
        }
    }
}

/// Externally exposed task status read model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskStatusView {
    pub task_id: String,
    pub status: TaskRunStatus,
    pub num_agents: u32,
    pub model: String,
    pub solution_found: bool,
    pub solution_agent_id: Option<u32>,
    pub agents: Vec<AgentSnapshot>,
    pub started_at: Option<DateTime<Utc>>,
    pub elapsed_secs: f64,
}

/// Externally exposed solution read model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolutionView {
    pub solution_found: bool,
    pub solution_agent_id: Option<u32>,
    pub solution: Option<String>,
    pub execution_time_secs: Option<f64>,
}

/// Aggregated statistics for one finished solve run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunStats {
    pub task_id: String,
    pub total_agents: u32,
    pub completed_agents: u32,
    pub successful_agents: u32,
    pub failed_agents: u32,
    pub solution_found: bool,
    pub solution_agent_id: Option<u32>,
    pub execution_time_secs: f64,
    pub success_rate: f64,
}

/// Aggregated metrics over the whole registry
#[derive(Debug, Default, Clone, Serialize)]
pub struct RegistryMetrics {
    pub total_tasks: u64,
    pub running_tasks: u64,
    pub completed_tasks: u64,
    pub running_agents: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentStatus;

    fn params() -> TaskParams {
        TaskParams {
            problem_statement: "prove it".to_string(),
            num_agents: 3,
            model: "google/gemini-2.5-pro".to_string(),
            api_key: "secret".to_string(),
            other_prompts: vec![],
            timeout: None,
            max_iterations: 30,
        }
    }

    #[test]
    fn test_new_task_is_pending() {
        let task = SolveTask::new("task-1", params());
        assert_eq!(task.run_status, TaskRunStatus::Pending);
        assert!(!task.solution_found);
        assert_eq!(task.elapsed_secs(), 0.0);
    }

    #[test]
    fn test_status_view_sorts_agents() {
        let mut task = SolveTask::new("task-1", params());
        for id in [2u32, 0, 1] {
            let mut state = AgentState::new(id);
            state.status = AgentStatus::Running;
            task.agents.insert(id, Arc::new(RwLock::new(state)));
        }

        let view = task.status_view();
        let ids: Vec<u32> = view.agents.iter().map(|a| a.agent_id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
        assert_eq!(view.model, "google/gemini-2.5-pro");
    }

    #[test]
    fn test_status_view_does_not_expose_credential() {
        let task = SolveTask::new("task-1", params());
        let json = serde_json::to_string(&task.status_view()).unwrap();
        assert!(!json.contains("secret"));
    }

    #[test]
    fn test_solution_view_before_completion() {
        let task = SolveTask::new("task-1", params());
        let view = task.solution_view();
        assert!(!view.solution_found);
        assert!(view.execution_time_secs.is_none());
    }
}
