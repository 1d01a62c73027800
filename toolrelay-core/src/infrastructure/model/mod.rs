//! Model infrastructure module
//!
//! The model is an external oracle: given the context and the advertised tools it
//! answers with text or with tool invocation requests.
//!
//! # Structure
//! - `types` - Request, Response, Error types
//! - `traits` - ModelProvider trait
//! - `anthropic` - Messages API client

pub mod anthropic;
pub mod traits;
pub mod types;

pub use anthropic::AnthropicClient;
pub use traits::ModelProvider;
pub use types::{ModelError, ModelRequest, ModelResponse, StopReason, ToolInvocation};
