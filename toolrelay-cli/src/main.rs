mod channel;
mod stdio;

use channel::ConsoleChannel;
use clap::Parser;
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use toolrelay_core::config::AppConfig;
use toolrelay_core::service::Bridge;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser, Debug)]
#[command(
    name = "toolrelay",
    version,
    about = "Terminal front-end for the toolrelay agent bridge"
)]
struct Cli {
    /// Configuration file (defaults to config/toolrelay.toml)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Name this terminal session talks as
    #[arg(long, default_value = "local")]
    principal: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    init_tracing();
    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?;
    info!(
        model = %config.model.model,
        servers = config.servers.len(),
        "configuration loaded"
    );

    let channel = Arc::new(ConsoleChannel::new(config.approval.timeout()));
    let bridge = Bridge::from_config(&config, channel);
    match bridge.recover().await {
        Ok(expired) if expired > 0 => info!(expired, "stale approvals expired"),
        Ok(_) => {}
        Err(err) => warn!(error = %err, "approval recovery failed"),
    }

    let result = stdio::run(bridge.service.clone(), cli.principal).await;
    bridge.shutdown().await;
    result?;
    Ok(())
}

/// Logs go to stderr; stdout belongs to the conversation.
fn init_tracing() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_level(true)
            .init();
    });
}
