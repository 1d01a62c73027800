pub mod app;
pub mod defaults;
pub mod error;
pub mod loader;
pub mod server;
pub mod settings;

pub use app::{
    AppConfig, ApprovalSettings, ConversationSettings, ModelSettings, OrchestratorSettings,
    RpcSettings, ToolSettings,
};
pub use error::ConfigError;
pub use loader::{ensure_env_loaded, load_config, parse_config};
pub use server::ServerConfig;
