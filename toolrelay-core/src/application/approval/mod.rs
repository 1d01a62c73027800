//! Human-in-the-loop approval of sensitive tool invocations

mod error;
mod gate;

pub use error::ApprovalError;
pub use gate::{ApprovalGate, ApprovalOutcome, DecisionOutcome, GateSettings, new_token};
