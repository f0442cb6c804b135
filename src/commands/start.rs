use anyhow::Result;
use colored::Colorize;
use pricebook::{config, server};
use tracing::info;

/// Execute the start command
///
/// This will:
/// 1. Load configuration
/// 2. Start the server in the foreground
pub async fn execute() -> Result<()> {
    println!("{}", "Starting pricing server...".green());

    let cfg = config::load_config()?;
    info!(
        "Configuration loaded: {}:{}",
        cfg.server.host, cfg.server.port
    );

    server::start_server(cfg).await
}
