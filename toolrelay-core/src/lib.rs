//! # toolrelay-core
//!
//! Core of the toolrelay agent bridge: drives a model through multi-round tool use,
//! gates sensitive invocations behind human approval, and keeps long-lived MCP stdio
//! servers connected for the remote bridge capability.
//!
//! ## Layout
//!
//! - [`domain`] - conversation, message and approval records
//! - [`infrastructure`] - JSON-RPC codec, model client, storage and channel seams
//! - [`application`] - connections, capabilities, approvals, history and the turn loop
//! - [`config`] - TOML configuration loading

pub mod application;
pub mod config;
pub mod constants;
pub mod domain;
pub mod infrastructure;

pub use application::{agent, approval, capability, history, service, tooling};
pub use config::{AppConfig, ConfigError};
pub use domain::types;
pub use infrastructure::{channel, model, rpc, storage};
