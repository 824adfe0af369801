use anyhow::Result;
use aws_cost_advisor::{config, init_tracing, server};
use colored::Colorize;
use std::path::Path;
use tracing::info;

/// Execute the start command
///
/// Loads and validates the configuration, initializes logging from it, then
/// runs the server until SIGTERM/SIGINT.
pub async fn execute(config_path: &Path) -> Result<()> {
    println!("{}", "Starting cost advisor in foreground mode...".green());

    let cfg = config::load_config(config_path)?;
    init_tracing(&cfg.server.log_level, &cfg.server.log_format);

    info!(config = %config_path.display(), "Starting AWS Cost Advisor");

    server::start_server(cfg, config_path.to_path_buf()).await?;

    Ok(())
}
