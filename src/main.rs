use caches::cli::{Cli, execute_command, load_and_merge_config};
use caches::logger::{LoggerConfig, init_logger};
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logger(LoggerConfig::for_verbosity(cli.verbose))?;

    let settings = load_and_merge_config(&cli)?;
    tracing::debug!(config_file = ?cli.config, "configuration loaded");

    if let Some(output) = execute_command(&cli, settings).await? {
        println!("{}", serde_json::to_string(&output)?);
    }
    Ok(())
}
