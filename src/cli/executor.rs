//! Command executor for dispatching CLI commands
//!
//! Every command runs inside [`Cache::scoped`], so the cache is connected
//! for exactly the duration of the command.

use futures::FutureExt;
use serde_json::Value;
use tracing::debug;

use super::parser::{Cli, Commands, Expiry};
use crate::cache::{Cache, CacheError, Options, Ttl};
use crate::config::CacheSettings;

/// Execute a CLI command with the given settings
///
/// Returns the JSON value to print, if the command produces one.
pub async fn execute_command(cli: &Cli, settings: CacheSettings) -> anyhow::Result<Option<Value>> {
    let mut cache = Cache::from_settings(settings)?;
    debug!(backend = cache.backend_name(), command = ?cli.command, "executing command");

    let command = cli.command.clone();
    let output = cache
        .scoped(move |cache| async move { run(cache, command).await }.boxed())
        .await?;
    Ok(output)
}

fn options(expiry: &Expiry) -> Options {
    let options = Options::new();
    if expiry.persist {
        options.never_expire()
    } else if let Some(seconds) = expiry.expire {
        options.with_ttl(Ttl::Seconds(seconds))
    } else {
        options
    }
}

async fn run(cache: &Cache, command: Commands) -> Result<Option<Value>, CacheError> {
    let output = match command {
        Commands::Get { key, default } => {
            Some(cache.get_or(&key, default.unwrap_or(Value::Null)).await?)
        }
        Commands::Set { key, value, expiry } => {
            cache.set_with(&key, &value, &options(&expiry)).await?;
            None
        }
        Commands::Add { key, value, expiry } => {
            Some(Value::Bool(cache.add_with(&key, &value, &options(&expiry)).await?))
        }
        Commands::Delete { keys } => {
            cache.delete_many(&keys).await?;
            None
        }
        Commands::Touch { key, expiry } => {
            Some(Value::Bool(cache.touch_with(&key, &options(&expiry)).await?))
        }
        Commands::Incr { key, delta } => Some(Value::Number(cache.incr(&key, delta).await?)),
        Commands::Decr { key, delta } => Some(Value::Number(cache.decr(&key, delta).await?)),
        Commands::Clear => {
            cache.clear().await?;
            None
        }
    };
    Ok(output)
}
