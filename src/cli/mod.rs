//! CLI module for caches
//!
//! This module provides command-line interface functionality including:
//! - Argument parsing with clap
//! - Configuration merging (CLI args + config files + environment)
//! - Command execution against a scoped cache connection

pub mod config_merger;
pub mod executor;
pub mod parser;
pub mod validation;

pub use config_merger::ConfigurationMerger;
pub use executor::execute_command;
pub use parser::{Cli, Commands};

use crate::config::CacheSettings;

/// Load configuration and apply CLI overrides
///
/// Precedence, highest first: CLI flags, `CACHES_*` environment variables,
/// the configuration file, built-in defaults.
pub fn load_and_merge_config(cli: &Cli) -> anyhow::Result<CacheSettings> {
    let merger = ConfigurationMerger::from_config_path(cli.config.as_deref())?;
    Ok(merger.merge_cli_args(cli))
}
