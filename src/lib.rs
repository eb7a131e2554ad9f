//! solverd - concurrent reasoning solver
//!
//! solverd races N independent solving agents against a single problem. Each
//! agent drives a draft→verify→correct loop against an external
//! text-completion service; the first agent to produce a rigorously verified
//! solution wins and the rest are cancelled. Per-agent progress streams to an
//! event bus consumed by outward transports.
//!
//! # Core Concepts
//!
//! - **Independent attempts**: every agent owns its own completion client and
//!   state; agents share nothing but the task-level winner flag
//! - **Two-pass verification**: success requires two consecutive positive
//!   verifier verdicts, guarding against a single noisy call
//! - **First completion wins**: agents are awaited in true completion order,
//!   and the winner is fixed by an atomic check-and-set in the registry
//! - **Fire-and-forget observability**: events go into a bounded broadcast
//!   bus; transport health never affects the solving loops
//!
//! # Modules
//!
//! - [`llm`] - completion client trait, OpenRouter implementation, model catalog
//! - [`agent`] - solving agent state and the draft/verify/correct engine
//! - [`orchestrator`] - concurrent fan-out/fan-in with first-success-wins
//! - [`task`] - in-memory task registry actor
//! - [`events`] - event bus and per-task sinks
//! - [`prompts`] - embedded prompt pack
//! - [`config`] - solve-run defaults
//! - [`cli`] - command-line interface

pub mod agent;
pub mod cli;
pub mod config;
pub mod events;
pub mod llm;
pub mod orchestrator;
pub mod prompts;
pub mod task;

// Re-export commonly used types
pub use agent::{AgentProgress, AgentSnapshot, AgentState, AgentStatus, LogEntry, SolverAgent};
pub use config::Config;
pub use events::{DEFAULT_CHANNEL_CAPACITY, EventBus, EventLogEntry, EventSink, TaskEvent, create_event_bus};
pub use llm::{
    CompletionClient, CompletionRequest, LlmError, Message, ModelConfig, ModelInfo, OpenRouterClient, Role,
    available_models, model_config,
};
pub use orchestrator::{ClientFactory, Orchestrator, latest_solution_path};
pub use task::{
    RegistryError, RegistryMetrics, RunStats, SolutionView, SolveTask, TaskParams, TaskRegistry, TaskRunStatus,
    TaskStatusView,
};
