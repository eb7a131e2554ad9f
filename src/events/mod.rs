//! Event streaming for live observability
//!
//! Every significant action in a solve run emits an event to a bounded
//! broadcast bus. Consumers (the push transport, log writers, the CLI
//! printer) subscribe; emitters never block on consumer health.
//!
//! ```text
//!  SolverAgent ──┐
//!  SolverAgent ──┼──▶ EventBus (broadcast) ──▶ transport / logger / CLI
//!  Orchestrator ─┘
//! ```

mod bus;
mod types;

pub use bus::{DEFAULT_CHANNEL_CAPACITY, EventBus, EventSink, create_event_bus};
pub use types::{EventLogEntry, TaskEvent};
