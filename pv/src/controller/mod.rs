//! Pivot/replace controller
//!
//! Layered on the composer: build and pivot start searches, keep toggles pins,
//! replace swaps one alternate into the plan.

mod machine;
mod outcome;

pub use machine::{ControllerMode, PlanController};
pub use outcome::{ControllerError, IgnoreReason, Notice, ReplaceOutcome, SearchKind, SearchOutcome, SearchTicket};
