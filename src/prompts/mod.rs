//! Prompt pack for the solving loop
//!
//! The instruction text sent to the completion service is opaque
//! configuration: it ships as `.pmt` files compiled into the binary. The
//! yes/no gate and verdict-classification prompts are built inline by the
//! solving loop because they interpolate draft content.

pub mod embedded;

pub use embedded::{CORRECTION, DRAFT, SELF_IMPROVEMENT, VERIFICATION_REMINDER, VERIFICATION_SYSTEM};
