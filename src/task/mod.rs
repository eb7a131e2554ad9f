//! Task registry module
//!
//! Keyed store of task metadata and per-agent state handles with an explicit
//! lifecycle (created → running → completed). An actor owns the map; the
//! orchestrator mutates through commands, status queries read concurrently.

mod messages;
mod registry;
mod types;

pub use messages::{RegistryCommand, RegistryError};
pub use registry::TaskRegistry;
pub use types::{RegistryMetrics, RunStats, SolutionView, SolveTask, TaskParams, TaskRunStatus, TaskStatusView};
