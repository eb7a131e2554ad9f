//! Orchestrator - races N solving agents against one problem
//!
//! Spawns every agent concurrently, awaits them in true completion order,
//! fixes the winner on the first verified success, cancels the stragglers,
//! and reduces the run statistics.

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::Utc;
use eyre::{Result, eyre};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::agent::{AgentState, AgentStatus, SolverAgent};
use crate::events::{EventBus, EventSink};
use crate::llm::{CompletionClient, OpenRouterClient};
use crate::task::{RunStats, SolveTask, TaskParams, TaskRegistry};

/// Builds one credential-bound client per agent
pub type ClientFactory = Arc<dyn Fn(u32, &str, &str) -> Result<Arc<dyn CompletionClient>> + Send + Sync>;

/// Top-level coordinator for solve runs
pub struct Orchestrator {
    registry: TaskRegistry,
    bus: Arc<EventBus>,
    client_factory: ClientFactory,
    solutions_dir: PathBuf,
}

impl Orchestrator {
    /// Create an orchestrator with the production OpenRouter client factory
    pub fn new(registry: TaskRegistry, bus: Arc<EventBus>) -> Self {
        debug!("Orchestrator::new: called");
        let factory: ClientFactory = Arc::new(|agent_id: u32, api_key: &str, model: &str| {
            debug!(agent_id, %model, "client_factory: building OpenRouter client");
            let client = OpenRouterClient::new(api_key, model)?;
            Ok(Arc::new(client) as Arc<dyn CompletionClient>)
        });

        Self {
            registry,
            bus,
            client_factory: factory,
            solutions_dir: PathBuf::from("solutions"),
        }
    }

    /// Override the directory winning solutions are written to
    pub fn with_solutions_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.solutions_dir = dir.into();
        self
    }

    /// Override the client factory (tests inject stub clients here)
    pub fn with_client_factory(mut self, factory: ClientFactory) -> Self {
        self.client_factory = factory;
        self
    }

    /// Register a new task and return its id
    pub async fn create_task(&self, params: TaskParams) -> Result<String> {
        let task_id = Uuid::new_v4().to_string();
        debug!(%task_id, num_agents = params.num_agents, "create_task: called");

        let num_agents = params.num_agents;
        let model = params.model.clone();
        self.registry.create(SolveTask::new(&task_id, params)).await?;

        info!(%task_id, num_agents, %model, "created task");
        Ok(task_id)
    }

    /// Run a task to completion and return the aggregated statistics
    pub async fn run_task(&self, task_id: &str) -> Result<RunStats> {
        debug!(%task_id, "run_task: called");
        let task = self
            .registry
            .fetch(task_id)
            .await?
            .ok_or_else(|| eyre!("task not found: {task_id}"))?;

        self.registry.mark_running(task_id).await?;
        let sink = self.bus.sink_for(task_id);
        let run_start = Utc::now();

        info!(%task_id, num_agents = task.num_agents, model = %task.model, "starting task");

        let mut set: JoinSet<(u32, Option<String>)> = JoinSet::new();

        for agent_id in 0..task.num_agents {
            let state = Arc::new(RwLock::new(AgentState::new(agent_id)));
            self.registry.attach_agent(task_id, agent_id, state.clone()).await?;

            let client = (self.client_factory)(agent_id, &task.api_key, &task.model)?;
            let agent = SolverAgent::new(agent_id, task_id, client, state.clone()).with_sink(sink.clone());

            debug!(%task_id, agent_id, "run_task: spawning agent");
            set.spawn(run_single_agent(
                agent,
                state,
                task.problem_statement.clone(),
                task.other_prompts.clone(),
                task.timeout,
                task.max_iterations,
                sink.clone(),
            ));
        }

        let mut completed: u32 = 0;
        let mut successful: u32 = 0;
        let mut failed: u32 = 0;
        let mut winner: Option<u32> = None;

        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((agent_id, Some(solution))) => {
                    debug!(%task_id, agent_id, "run_task: agent produced a solution");
                    completed += 1;
                    successful += 1;

                    match self.registry.record_winner(task_id, agent_id, solution.clone()).await {
                        Ok(true) => {
                            info!(%task_id, agent_id, "first verified solution, cancelling remaining agents");
                            winner = Some(agent_id);
                            self.save_solution_to_file(task_id, agent_id, &solution).await;
                            sink.solution_found(agent_id, &solution);
                            set.abort_all();
                        }
                        Ok(false) => {
                            debug!(%task_id, agent_id, "run_task: winner already recorded, ignoring");
                        }
                        Err(e) => {
                            warn!(%task_id, agent_id, error = %e, "run_task: failed to record winner");
                        }
                    }
                }
                Ok((agent_id, None)) => {
                    debug!(%task_id, agent_id, "run_task: agent finished without a solution");
                    completed += 1;
                    failed += 1;
                }
                Err(e) if e.is_cancelled() => {
                    debug!(%task_id, "run_task: agent cancelled after winner");
                }
                Err(e) => {
                    error!(%task_id, error = %e, "agent task panicked, treating as no solution");
                    failed += 1;
                }
            }
        }

        self.registry.mark_completed(task_id).await?;

        let total = task.num_agents;
        let stats = RunStats {
            task_id: task_id.to_string(),
            total_agents: total,
            completed_agents: completed,
            successful_agents: successful,
            failed_agents: failed,
            solution_found: winner.is_some(),
            solution_agent_id: winner,
            execution_time_secs: (Utc::now() - run_start).num_milliseconds() as f64 / 1000.0,
            success_rate: if total > 0 {
                f64::from(successful) / f64::from(total) * 100.0
            } else {
                0.0
            },
        };

        sink.task_complete(stats.clone());
        info!(%task_id, completed, successful, failed, winner = ?winner, "task complete");

        Ok(stats)
    }

    /// Persist the winning solution: a task-scoped file plus `latest_solution.txt`
    ///
    /// Write failures are logged and swallowed; persistence never fails the run.
    async fn save_solution_to_file(&self, task_id: &str, agent_id: u32, solution: &str) {
        if let Err(e) = self.write_solution_files(task_id, agent_id, solution).await {
            error!(%task_id, agent_id, error = %e, "failed to save solution to file");
        }
    }

    async fn write_solution_files(&self, task_id: &str, agent_id: u32, solution: &str) -> Result<()> {
        tokio::fs::create_dir_all(&self.solutions_dir).await?;

        let now = Utc::now();
        let short_id = &task_id[..task_id.len().min(8)];
        let filename = self
            .solutions_dir
            .join(format!("solution_{short_id}_agent{agent_id}_{}.txt", now.format("%Y%m%d_%H%M%S")));

        let header = format!(
            "Task ID: {task_id}\nAgent ID: {agent_id}\nTimestamp: {}\n{}\n\n",
            now.to_rfc3339(),
            "=".repeat(60)
        );
        tokio::fs::write(&filename, format!("{header}{solution}")).await?;
        info!(%task_id, agent_id, file = %filename.display(), "solution saved");

        let latest = self.solutions_dir.join("latest_solution.txt");
        let latest_body = format!(
            "Task ID: {task_id}\nAgent ID: {agent_id}\nTimestamp: {}\nFile: {}\n{}\n\n{solution}",
            now.to_rfc3339(),
            filename.display(),
            "=".repeat(60)
        );
        tokio::fs::write(&latest, latest_body).await?;
        info!(file = %latest.display(), "latest solution saved");

        Ok(())
    }
}

/// Run one agent to its terminal state, bounded by the per-agent timeout
///
/// Timeouts and internal failures both come back as "no solution"; only the
/// affected agent is marked failed.
async fn run_single_agent(
    agent: SolverAgent,
    state: Arc<RwLock<AgentState>>,
    problem_statement: String,
    other_prompts: Vec<String>,
    timeout: Option<Duration>,
    max_iterations: u32,
    sink: EventSink,
) -> (u32, Option<String>) {
    let agent_id = agent.agent_id();
    debug!(agent_id, ?timeout, "run_single_agent: called");

    let solve = agent.solve(&problem_statement, &other_prompts, max_iterations);

    let solution = match timeout {
        Some(limit) => match tokio::time::timeout(limit, solve).await {
            Ok(solution) => solution,
            Err(_) => {
                warn!(agent_id, ?limit, "agent timed out");
                let progress = {
                    let mut guard = state.write().expect("agent state lock poisoned");
                    guard.status = AgentStatus::Failed;
                    guard.current_step = "timed out".to_string();
                    guard.finished_at = Some(Utc::now());
                    let mut progress = guard.progress();
                    progress.error = Some("Timeout".to_string());
                    progress
                };
                sink.agent_update(agent_id, AgentStatus::Failed, progress);
                None
            }
        },
        None => solve.await,
    };

    debug!(agent_id, found = solution.is_some(), "run_single_agent: complete");
    (agent_id, solution)
}

/// Path to the fixed most-recent-solution file under a solutions directory
pub fn latest_solution_path(solutions_dir: &Path) -> PathBuf {
    solutions_dir.join("latest_solution.txt")
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use tempfile::tempdir;

    use super::*;
    use crate::events::create_event_bus;
    use crate::llm::{CompletionRequest, LlmError};
    use crate::task::TaskRunStatus;

    /// Stub that walks the full solve protocol to success, optionally after a delay
    struct SucceedingStub {
        agent_id: u32,
        delay: Duration,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CompletionClient for SucceedingStub {
        async fn complete(&self, _request: CompletionRequest) -> Result<String, LlmError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call == 1 && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            // 1: draft, 2: self-review, 3: completeness gate, then
            // alternating verifier report / "yes" verdict pairs
            let text = match call {
                1 => "first draft".to_string(),
                2 => format!("solution from agent {}", self.agent_id),
                3 => "yes".to_string(),
                n if n % 2 == 0 => "Verdict: correct".to_string(),
                _ => "yes".to_string(),
            };
            Ok(text)
        }
    }

    /// Stub whose completeness gate always rejects the draft
    struct GateFailingStub;

    #[async_trait]
    impl CompletionClient for GateFailingStub {
        async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError> {
            if request.user_prompt.contains("claiming that the solution is complete") {
                Ok("no".to_string())
            } else {
                Ok("some draft".to_string())
            }
        }
    }

    fn succeeding_factory(delays: &'static [u64]) -> ClientFactory {
        Arc::new(move |agent_id, _key, _model| {
            let delay = Duration::from_millis(delays[agent_id as usize]);
            Ok(Arc::new(SucceedingStub {
                agent_id,
                delay,
                calls: AtomicUsize::new(0),
            }) as Arc<dyn CompletionClient>)
        })
    }

    fn params(num_agents: u32, timeout: Option<Duration>) -> TaskParams {
        TaskParams {
            problem_statement: "prove it".to_string(),
            num_agents,
            model: "test/model".to_string(),
            api_key: "key".to_string(),
            other_prompts: vec![],
            timeout,
            max_iterations: 30,
        }
    }

    #[tokio::test]
    async fn test_single_agent_end_to_end_success() {
        let dir = tempdir().unwrap();
        let registry = TaskRegistry::spawn();
        let orchestrator = Orchestrator::new(registry.clone(), create_event_bus())
            .with_solutions_dir(dir.path())
            .with_client_factory(succeeding_factory(&[0]));

        let task_id = orchestrator.create_task(params(1, None)).await.unwrap();
        let stats = orchestrator.run_task(&task_id).await.unwrap();

        assert_eq!(stats.total_agents, 1);
        assert_eq!(stats.completed_agents, 1);
        assert_eq!(stats.successful_agents, 1);
        assert_eq!(stats.failed_agents, 0);
        assert!(stats.solution_found);
        assert_eq!(stats.solution_agent_id, Some(0));
        assert!((stats.success_rate - 100.0).abs() < f64::EPSILON);

        // Agent state reflects two consecutive verification passes
        let view = registry.status(&task_id).await.unwrap().unwrap();
        assert_eq!(view.status, TaskRunStatus::Completed);
        assert_eq!(view.agents[0].correct_count, 2);

        // Both solution files were written
        let latest = std::fs::read_to_string(latest_solution_path(dir.path())).unwrap();
        assert!(latest.contains("solution from agent 0"));
        let files: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(files.len(), 2);
    }

    #[tokio::test]
    async fn test_first_completion_wins_under_concurrency() {
        let dir = tempdir().unwrap();
        let registry = TaskRegistry::spawn();
        // Agent 3 finishes far earlier than its siblings
        let orchestrator = Orchestrator::new(registry.clone(), create_event_bus())
            .with_solutions_dir(dir.path())
            .with_client_factory(succeeding_factory(&[2000, 2000, 2000, 10, 2000]));

        let task_id = orchestrator.create_task(params(5, None)).await.unwrap();
        let stats = orchestrator.run_task(&task_id).await.unwrap();

        assert!(stats.solution_found);
        assert_eq!(stats.solution_agent_id, Some(3));

        // Exactly one winner is ever recorded
        let view = registry.solution(&task_id).await.unwrap();
        assert_eq!(view.solution_agent_id, Some(3));
        assert_eq!(view.solution.as_deref(), Some("solution from agent 3"));
    }

    #[tokio::test]
    async fn test_agent_timeout_fails_only_that_agent() {
        let dir = tempdir().unwrap();
        let registry = TaskRegistry::spawn();
        let orchestrator = Orchestrator::new(registry.clone(), create_event_bus())
            .with_solutions_dir(dir.path())
            .with_client_factory(succeeding_factory(&[10_000]));

        let task_id = orchestrator
            .create_task(params(1, Some(Duration::from_millis(100))))
            .await
            .unwrap();
        let stats = orchestrator.run_task(&task_id).await.unwrap();

        assert!(!stats.solution_found);
        assert_eq!(stats.completed_agents, 1);
        assert_eq!(stats.failed_agents, 1);

        let view = registry.status(&task_id).await.unwrap().unwrap();
        assert_eq!(view.agents[0].status, AgentStatus::Failed);
    }

    #[tokio::test]
    async fn test_zero_success_surfaces_stats_not_failure() {
        let dir = tempdir().unwrap();
        let registry = TaskRegistry::spawn();
        let factory: ClientFactory =
            Arc::new(|_, _, _| Ok(Arc::new(GateFailingStub) as Arc<dyn CompletionClient>));
        let orchestrator = Orchestrator::new(registry.clone(), create_event_bus())
            .with_solutions_dir(dir.path())
            .with_client_factory(factory);

        let task_id = orchestrator.create_task(params(3, None)).await.unwrap();
        let stats = orchestrator.run_task(&task_id).await.unwrap();

        assert!(!stats.solution_found);
        assert!(stats.solution_agent_id.is_none());
        assert_eq!(stats.completed_agents, 3);
        assert_eq!(stats.failed_agents, 3);
        assert_eq!(stats.successful_agents, 0);
        assert!(stats.success_rate.abs() < f64::EPSILON);

        // No solution files written
        assert!(!latest_solution_path(dir.path()).exists());
    }

    #[tokio::test]
    async fn test_task_complete_event_is_emitted() {
        let dir = tempdir().unwrap();
        let registry = TaskRegistry::spawn();
        let bus = create_event_bus();
        let mut rx = bus.subscribe();
        let orchestrator = Orchestrator::new(registry, bus.clone())
            .with_solutions_dir(dir.path())
            .with_client_factory(succeeding_factory(&[0]));

        let task_id = orchestrator.create_task(params(1, None)).await.unwrap();
        orchestrator.run_task(&task_id).await.unwrap();

        let mut saw_task_complete = false;
        while let Ok(event) = rx.try_recv() {
            if let crate::events::TaskEvent::TaskComplete { stats, .. } = event {
                assert_eq!(stats.total_agents, 1);
                assert!(stats.solution_found);
                saw_task_complete = true;
            }
        }
        assert!(saw_task_complete);
    }

    #[tokio::test]
    async fn test_run_unknown_task_is_an_error() {
        let registry = TaskRegistry::spawn();
        let orchestrator = Orchestrator::new(registry, create_event_bus());
        assert!(orchestrator.run_task("missing").await.is_err());
    }
}
