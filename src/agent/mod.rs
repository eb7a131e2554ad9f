//! Solving agent module
//!
//! One agent owns one independent attempt at the problem: its own completion
//! client, its own state, and the draft/verify/correct loop.

mod engine;
mod state;

pub use engine::SolverAgent;
pub use state::{AgentProgress, AgentSnapshot, AgentState, AgentStatus, LogEntry};
