//! SolverAgent - drives one independent draft/verify/correct attempt
//!
//! The loop: initial draft, self-review, completeness gate, then iterated
//! verification and correction until two consecutive passes (success), ten
//! consecutive failures (circuit breaker), or the iteration budget runs out.

use std::sync::{Arc, RwLock};

use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::events::EventSink;
use crate::llm::{CompletionClient, CompletionRequest, Message};
use crate::prompts::{CORRECTION, DRAFT, SELF_IMPROVEMENT, VERIFICATION_REMINDER, VERIFICATION_SYSTEM};

use super::state::{AgentState, AgentStatus};

/// Consecutive positive verifications required to declare success
///
/// Two independent passes guard against a single noisy verifier call.
const REQUIRED_CONSECUTIVE_PASSES: u32 = 2;

/// Consecutive negative verifications that trip the circuit breaker
const MAX_CONSECUTIVE_ERRORS: u32 = 10;

/// Marker separating the formal solution from the preamble in a draft
const DETAILED_SOLUTION_MARKER: &str = "Detailed Solution";

/// Marker separating the verifier's verdict summary from its step-by-step log
const DETAILED_VERIFICATION_MARKER: &str = "Detailed Verification";

/// Extract the section before or after a marker; empty when the marker is absent
fn extract_section(text: &str, marker: &str, after: bool) -> String {
    match text.find(marker) {
        Some(idx) => {
            if after {
                text[idx + marker.len()..].trim().to_string()
            } else {
                text[..idx].trim().to_string()
            }
        }
        None => String::new(),
    }
}

/// The sole correctness predicate: a case-insensitive "yes" in the verdict
fn verdict_is_yes(text: &str) -> bool {
    text.to_lowercase().contains("yes")
}

/// One independent solving attempt against a single problem
pub struct SolverAgent {
    agent_id: u32,
    task_id: String,
    api: Arc<dyn CompletionClient>,
    sink: Option<EventSink>,
    state: Arc<RwLock<AgentState>>,
}

impl SolverAgent {
    /// Create a new agent bound to its own completion client and state handle
    pub fn new(
        agent_id: u32,
        task_id: impl Into<String>,
        api: Arc<dyn CompletionClient>,
        state: Arc<RwLock<AgentState>>,
    ) -> Self {
        let task_id = task_id.into();
        debug!(agent_id, %task_id, "SolverAgent::new: called");
        Self {
            agent_id,
            task_id,
            api,
            sink: None,
            state,
        }
    }

    /// Attach an event sink mirroring progress to the observer
    pub fn with_sink(mut self, sink: EventSink) -> Self {
        debug!(agent_id = self.agent_id, "with_sink: called");
        self.sink = Some(sink);
        self
    }

    pub fn agent_id(&self) -> u32 {
        self.agent_id
    }

    fn write_state(&self, f: impl FnOnce(&mut AgentState)) {
        let mut guard = self.state.write().expect("agent state lock poisoned");
        f(&mut guard);
    }

    fn read_state<R>(&self, f: impl FnOnce(&AgentState) -> R) -> R {
        let guard = self.state.read().expect("agent state lock poisoned");
        f(&guard)
    }

    /// Record a log line and mirror it to the sink
    fn log(&self, level: &str, message: &str) {
        match level {
            "error" => error!(agent_id = self.agent_id, "{message}"),
            "warning" => warn!(agent_id = self.agent_id, "{message}"),
            _ => info!(agent_id = self.agent_id, "{message}"),
        }

        self.write_state(|s| s.push_log(level, message));

        if let Some(sink) = &self.sink {
            sink.log(self.agent_id, level, message);
        }
    }

    /// Update status (and step label) and mirror the transition to the sink
    fn update_status(&self, status: AgentStatus, current_step: &str) {
        self.write_state(|s| {
            s.status = status;
            if !current_step.is_empty() {
                s.current_step = current_step.to_string();
            }
        });

        info!(agent_id = self.agent_id, %status, step = current_step, "status update");

        if let Some(sink) = &self.sink {
            let progress = self.read_state(AgentState::progress);
            sink.agent_update(self.agent_id, status, progress);
        }
    }

    /// Ask whether the draft claims to be complete
    ///
    /// A gate call error counts as "no".
    async fn check_solution_complete(&self, solution: &str) -> bool {
        debug!(agent_id = self.agent_id, "check_solution_complete: called");
        let check_prompt = format!(
            "Is the following text claiming that the solution is complete?\n\
             ==========================================================\n\n\
             {solution}\n\n\
             ==========================================================\n\n\
             Response in exactly \"yes\" or \"no\". No other words."
        );

        match self.api.complete(CompletionRequest::new("", check_prompt)).await {
            Ok(result) => verdict_is_yes(&result),
            Err(e) => {
                self.log("error", &format!("completeness check failed: {e}"));
                false
            }
        }
    }

    /// Verify the draft and classify the verdict
    ///
    /// Returns `(bug_report, verdict_text)`. The bug report is empty on a
    /// positive verdict; a call error yields the error text and a "no" verdict.
    async fn verify_solution(&self, problem_statement: &str, solution: &str) -> (String, String) {
        self.update_status(AgentStatus::Verifying, "verifying solution");
        self.log("info", "starting verification");

        let detailed_solution = extract_section(solution, DETAILED_SOLUTION_MARKER, true);

        let verification_prompt = format!(
            "\n======================================================================\n\
             ### Problem ###\n\n\
             {problem_statement}\n\n\
             ======================================================================\n\
             ### Solution ###\n\n\
             {detailed_solution}\n\n\
             {VERIFICATION_REMINDER}\n"
        );

        let verification_result = match self
            .api
            .complete(CompletionRequest::new(VERIFICATION_SYSTEM, verification_prompt))
            .await
        {
            Ok(text) => text,
            Err(e) => {
                self.log("error", &format!("verification call failed: {e}"));
                return (e.to_string(), "no".to_string());
            }
        };

        self.log("info", "verification complete, classifying verdict");

        let check_prompt = format!(
            "Response in \"yes\" or \"no\". Is the following statement saying the solution \
             is correct, or does not contain critical error or a major justification gap?\n\n\
             {verification_result}"
        );

        let verdict = match self.api.complete(CompletionRequest::new("", check_prompt)).await {
            Ok(text) => text,
            Err(e) => {
                self.log("error", &format!("verdict classification failed: {e}"));
                return (e.to_string(), "no".to_string());
            }
        };

        let is_correct = verdict_is_yes(&verdict);

        let bug_report = if is_correct {
            String::new()
        } else {
            extract_section(&verification_result, DETAILED_VERIFICATION_MARKER, false)
        };

        self.log(
            if is_correct { "info" } else { "warning" },
            &format!("verification result: {}", if is_correct { "passed" } else { "failed" }),
        );

        (bug_report, verdict)
    }

    /// Produce the first working solution: draft, self-review, gate, verify
    ///
    /// Returns `(solution, bug_report, verdict)`, or None when the draft
    /// fails, the gate rejects it, or a completion call errors out.
    async fn initial_exploration(
        &self,
        problem_statement: &str,
        other_prompts: &[String],
    ) -> Option<(String, String, String)> {
        self.log("info", "starting initial draft");

        let mut user_prompts = vec![problem_statement.to_string()];
        user_prompts.extend(other_prompts.iter().cloned());
        let user_prompt = user_prompts.join("\n\n");

        self.update_status(AgentStatus::Running, "generating initial draft");
        let first_draft = match self.api.complete(CompletionRequest::new(DRAFT, user_prompt)).await {
            Ok(text) => text,
            Err(e) => {
                self.log("error", &format!("initial draft failed: {e}"));
                return None;
            }
        };

        self.log("info", "initial draft complete");

        self.update_status(AgentStatus::Running, "self-review");
        let request =
            CompletionRequest::new(DRAFT, SELF_IMPROVEMENT).with_history(vec![Message::assistant(&first_draft)]);
        let solution = match self.api.complete(request).await {
            Ok(text) => text,
            Err(e) => {
                self.log("error", &format!("self-review failed: {e}"));
                return None;
            }
        };

        self.log("info", "self-review complete");

        if !self.check_solution_complete(&solution).await {
            self.log("warning", "draft does not claim completeness");
            return None;
        }

        let (bug_report, verdict) = self.verify_solution(problem_statement, &solution).await;

        Some((solution, bug_report, verdict))
    }

    /// Run the solving loop to a terminal state
    ///
    /// Returns the verified solution, or None when the agent fails.
    pub async fn solve(
        &self,
        problem_statement: &str,
        other_prompts: &[String],
        max_iterations: u32,
    ) -> Option<String> {
        self.write_state(|s| s.started_at = Some(Utc::now()));
        self.update_status(AgentStatus::Running, "starting");
        self.log("info", &format!("starting solve run, max iterations: {max_iterations}"));

        let Some((mut solution, mut bug_report, mut verdict)) =
            self.initial_exploration(problem_statement, other_prompts).await
        else {
            self.log("error", "initial draft did not produce a complete solution");
            self.update_status(AgentStatus::Failed, "initial draft failed");
            self.write_state(|s| s.finished_at = Some(Utc::now()));
            return None;
        };

        for i in 0..max_iterations {
            self.write_state(AgentState::begin_iteration);

            let (correct, errors) = self.read_state(|s| (s.correct_count, s.error_count));
            self.log(
                "info",
                &format!(
                    "iteration {}/{}, correct: {}, errors: {}",
                    i + 1,
                    max_iterations,
                    correct,
                    errors
                ),
            );

            if !verdict_is_yes(&verdict) {
                self.write_state(AgentState::record_failure);

                self.update_status(AgentStatus::Running, &format!("correcting issues (iteration {})", i + 1));
                self.log("warning", "verification failed, requesting correction");

                let correction_prompt = format!("{CORRECTION}\n\n{bug_report}");
                let request =
                    CompletionRequest::new(DRAFT, correction_prompt).with_history(vec![Message::assistant(&solution)]);

                match self.api.complete(request).await {
                    Ok(corrected) => {
                        solution = corrected;
                        if !self.check_solution_complete(&solution).await {
                            self.log("warning", "corrected draft does not claim completeness");
                            continue;
                        }
                    }
                    Err(e) => {
                        self.log("error", &format!("correction call failed: {e}"));
                        continue;
                    }
                }
            }

            let (report, new_verdict) = self.verify_solution(problem_statement, &solution).await;
            bug_report = report;
            verdict = new_verdict;

            if verdict_is_yes(&verdict) {
                self.write_state(AgentState::record_pass);
                let correct = self.read_state(|s| s.correct_count);
                self.log(
                    "info",
                    &format!("verification passed ({correct}/{REQUIRED_CONSECUTIVE_PASSES})"),
                );

                if correct >= REQUIRED_CONSECUTIVE_PASSES {
                    self.log("info", "found a verified solution");
                    self.update_status(AgentStatus::Success, "verified solution found");
                    self.write_state(|s| {
                        s.solution = Some(solution.clone());
                        s.finished_at = Some(Utc::now());
                    });

                    if let Some(sink) = &self.sink {
                        sink.solution_found(self.agent_id, &solution);
                    }

                    return Some(solution);
                }
            }

            if self.read_state(|s| s.error_count) >= MAX_CONSECUTIVE_ERRORS {
                self.log("error", "too many consecutive failed verifications, stopping");
                break;
            }
        }

        self.log("error", "no verified solution found");
        self.update_status(AgentStatus::Failed, "solve failed");
        self.write_state(|s| s.finished_at = Some(Utc::now()));
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{EventBus, TaskEvent};
    use crate::llm::LlmError;
    use crate::llm::client::mock::MockCompletionClient;

    fn make_agent(client: Arc<MockCompletionClient>) -> (SolverAgent, Arc<RwLock<AgentState>>) {
        let state = Arc::new(RwLock::new(AgentState::new(0)));
        let agent = SolverAgent::new(0, "task-1", client, state.clone());
        (agent, state)
    }

    /// Prologue shared by every run: draft, self-review, gate verdict
    fn prologue(gate: &str) -> Vec<Result<String, LlmError>> {
        vec![
            Ok("first draft".to_string()),
            Ok("improved solution".to_string()),
            Ok(gate.to_string()),
        ]
    }

    /// One verification round: verifier report plus yes/no classification
    fn verification(verdict: &str) -> Vec<Result<String, LlmError>> {
        vec![Ok("Verdict\n\nDetailed Verification\nstep analysis".to_string()), Ok(verdict.to_string())]
    }

    /// One correction round: corrected draft plus gate verdict
    fn correction(gate: &str) -> Vec<Result<String, LlmError>> {
        vec![Ok("corrected solution".to_string()), Ok(gate.to_string())]
    }

    #[test]
    fn test_extract_section_after_marker() {
        let text = "preamble\nDetailed Solution\n  the real proof  ";
        assert_eq!(extract_section(text, "Detailed Solution", true), "the real proof");
    }

    #[test]
    fn test_extract_section_before_marker() {
        let text = "summary of issues\nDetailed Verification\nsteps";
        assert_eq!(extract_section(text, "Detailed Verification", false), "summary of issues");
    }

    #[test]
    fn test_extract_section_missing_marker() {
        assert_eq!(extract_section("no markers here", "Detailed Solution", true), "");
    }

    #[test]
    fn test_verdict_is_yes_case_insensitive() {
        assert!(verdict_is_yes("Yes."));
        assert!(verdict_is_yes("the answer is YES"));
        assert!(!verdict_is_yes("no"));
    }

    #[tokio::test]
    async fn test_two_consecutive_passes_is_success() {
        let mut responses = prologue("yes");
        responses.extend(verification("yes")); // exploration verification
        responses.extend(verification("yes")); // pass 1
        responses.extend(verification("yes")); // pass 2

        let client = Arc::new(MockCompletionClient::new(responses));
        let (agent, state) = make_agent(client.clone());

        let result = agent.solve("problem", &[], 30).await;

        assert_eq!(result.as_deref(), Some("improved solution"));
        let state = state.read().unwrap();
        assert_eq!(state.status, AgentStatus::Success);
        assert_eq!(state.correct_count, 2);
        assert_eq!(state.error_count, 0);
        assert_eq!(state.iteration, 2);
        assert_eq!(state.solution.as_deref(), Some("improved solution"));
        assert_eq!(client.call_count(), 9);
    }

    #[tokio::test]
    async fn test_completeness_gate_rejection_fails_without_iterating() {
        let client = Arc::new(MockCompletionClient::new(prologue("no")));
        let (agent, state) = make_agent(client.clone());

        let result = agent.solve("problem", &[], 30).await;

        assert!(result.is_none());
        let state = state.read().unwrap();
        assert_eq!(state.status, AgentStatus::Failed);
        assert_eq!(state.iteration, 0);
        assert_eq!(client.call_count(), 3);
    }

    #[tokio::test]
    async fn test_always_no_verifier_fails_after_max_iterations() {
        let mut responses = prologue("yes");
        responses.extend(verification("no"));
        for _ in 0..5 {
            responses.extend(correction("yes"));
            responses.extend(verification("no"));
        }

        let client = Arc::new(MockCompletionClient::new(responses));
        let (agent, state) = make_agent(client.clone());

        let result = agent.solve("problem", &[], 5).await;

        assert!(result.is_none());
        let state = state.read().unwrap();
        assert_eq!(state.status, AgentStatus::Failed);
        assert_eq!(state.iteration, 5);
        assert_eq!(state.error_count, 5);
        assert_eq!(state.correct_count, 0);
        assert_eq!(client.call_count(), 25);
    }

    #[tokio::test]
    async fn test_circuit_breaker_stops_before_max_iterations() {
        let mut responses = prologue("yes");
        responses.extend(verification("no"));
        for _ in 0..10 {
            responses.extend(correction("yes"));
            responses.extend(verification("no"));
        }

        let client = Arc::new(MockCompletionClient::new(responses));
        let (agent, state) = make_agent(client.clone());

        let result = agent.solve("problem", &[], 30).await;

        assert!(result.is_none());
        let state = state.read().unwrap();
        assert_eq!(state.status, AgentStatus::Failed);
        assert_eq!(state.iteration, 10);
        assert_eq!(state.error_count, 10);
        assert_eq!(client.call_count(), 45);
    }

    #[tokio::test]
    async fn test_draft_error_aborts_agent() {
        let client = Arc::new(MockCompletionClient::new(vec![Err(LlmError::ApiError {
            status: 500,
            message: "boom".to_string(),
        })]));
        let (agent, state) = make_agent(client.clone());

        let result = agent.solve("problem", &[], 30).await;

        assert!(result.is_none());
        let state = state.read().unwrap();
        assert_eq!(state.status, AgentStatus::Failed);
        assert_eq!(client.call_count(), 1);
    }

    #[tokio::test]
    async fn test_correction_error_skips_the_pass() {
        let mut responses = prologue("yes");
        responses.extend(verification("no"));
        // Pass 1: the correction call errors, verification is skipped
        responses.push(Err(LlmError::ApiError {
            status: 502,
            message: "bad gateway".to_string(),
        }));
        // Pass 2: correction succeeds but verification still fails
        responses.extend(correction("yes"));
        responses.extend(verification("no"));

        let client = Arc::new(MockCompletionClient::new(responses));
        let (agent, state) = make_agent(client.clone());

        let result = agent.solve("problem", &[], 2).await;

        assert!(result.is_none());
        let state = state.read().unwrap();
        assert_eq!(state.status, AgentStatus::Failed);
        assert_eq!(state.iteration, 2);
        assert_eq!(state.error_count, 2);
        assert_eq!(client.call_count(), 10);
    }

    #[tokio::test]
    async fn test_success_emits_solution_found_event() {
        let mut responses = prologue("yes");
        responses.extend(verification("yes"));
        responses.extend(verification("yes"));
        responses.extend(verification("yes"));

        let bus = EventBus::with_default_capacity();
        let mut rx = bus.subscribe();

        let client = Arc::new(MockCompletionClient::new(responses));
        let state = Arc::new(RwLock::new(AgentState::new(4)));
        let agent = SolverAgent::new(4, "task-events", client, state.clone()).with_sink(bus.sink_for("task-events"));

        let result = agent.solve("problem", &[], 30).await;
        assert!(result.is_some());

        let mut saw_success_update = false;
        let mut saw_solution_found = false;
        while let Ok(event) = rx.try_recv() {
            match event {
                TaskEvent::AgentUpdate { agent_id, status, .. } => {
                    assert_eq!(agent_id, 4);
                    if status == AgentStatus::Success {
                        saw_success_update = true;
                    }
                }
                TaskEvent::SolutionFound { agent_id, solution, .. } => {
                    assert_eq!(agent_id, 4);
                    assert_eq!(solution, "improved solution");
                    saw_solution_found = true;
                }
                _ => {}
            }
        }
        assert!(saw_success_update);
        assert!(saw_solution_found);
    }
}
