//! # Agent Module
//!
//! Drives one user turn: call the model, run the tools it asks for (behind the approval
//! gate where required), feed the results back and repeat until the model ends the
//! turn or the round ceiling is hit.
//!
//! ## Key Types
//!
//! - [`Orchestrator`] - the turn loop
//! - [`OrchestratorOptions`] - model, prompt and round ceiling
//! - [`TurnOutcome`] - how the turn ended and which tools ran
//! - [`AgentError`] - failures that abort a turn

mod errors;
mod models;
mod runner;


pub use errors::AgentError;
pub use models::{OrchestratorOptions, ToolStep, TurnOutcome, TurnStatus};
pub use runner::Orchestrator;
