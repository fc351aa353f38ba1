//! CLI argument parsing with clap
//!
//! This module defines the command-line interface structure using clap,
//! including all commands, arguments, and their documentation.

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};
use serde_json::Value;

use super::validation::{parse_delta, parse_value, validate_config_file_path, validate_default_ttl};
use crate::build;

/// Inspect and modify a cache from the command line
#[derive(Parser, Debug)]
#[command(name = "caches")]
#[command(about = "Inspect and modify a cache from the command line")]
#[command(long_about = "
caches talks to any supported cache backend (dummy, locmem, redis, rediss)
through the same interface the library exposes. Values are read and printed
as JSON.

EXAMPLES:
    # Store and read back a value in Redis database 1
    caches --url redis://localhost:6379/1 set user:1 '{\"name\":\"ferris\"}'
    caches --url redis://localhost:6379/1 get user:1

    # Store with a 60 second expiry under a key prefix
    caches --url redis://localhost/0 --prefix app set session abc --expire 60

    # Count things
    caches --url redis://localhost/0 add hits 0
    caches --url redis://localhost/0 incr hits 5

    # Use settings from a file, with environment overrides
    CACHES_KEY_PREFIX=staging caches --config caches.toml get feature-flags
")]
#[command(version = build::CLAP_LONG_VERSION)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path
    ///
    /// TOML file holding cache settings (url, ttl, version, key_prefix,
    /// min_size, max_size, connection_timeout). Defaults to the file named
    /// by CACHES_CONFIG_FILE, if any.
    #[arg(short, long, value_name = "FILE", value_parser = validate_config_file_path)]
    pub config: Option<PathBuf>,

    /// Connection URL, e.g. redis://localhost:6379/1
    #[arg(short, long, value_name = "URL")]
    pub url: Option<String>,

    /// Key prefix
    #[arg(short, long, value_name = "PREFIX")]
    pub prefix: Option<String>,

    /// Default key version
    #[arg(long, value_name = "VERSION")]
    pub cache_version: Option<String>,

    /// Default time-to-live in seconds; must be greater than 0
    #[arg(long, value_name = "SECONDS", value_parser = validate_default_ttl)]
    pub ttl: Option<u64>,

    /// Increase log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Print the value stored under a key
    ///
    /// Prints the default (null unless given) when the key is absent or expired.
    Get {
        key: String,

        /// Value printed when the key is missing
        #[arg(long, value_name = "JSON", value_parser = parse_value)]
        default: Option<Value>,
    },
    /// Store a value, replacing any existing one
    Set {
        key: String,

        /// JSON value; anything that is not valid JSON is stored as a string
        #[arg(value_parser = parse_value)]
        value: Value,

        #[command(flatten)]
        expiry: Expiry,
    },
    /// Store a value only if the key is not set; prints whether it was stored
    Add {
        key: String,

        #[arg(value_parser = parse_value)]
        value: Value,

        #[command(flatten)]
        expiry: Expiry,
    },
    /// Remove one or more keys
    Delete {
        #[arg(required = true)]
        keys: Vec<String>,
    },
    /// Reset the expiry of a key; prints whether the key existed
    Touch {
        key: String,

        #[command(flatten)]
        expiry: Expiry,
    },
    /// Add to a stored number and print the result
    Incr {
        key: String,

        #[arg(default_value = "1", allow_negative_numbers = true, value_parser = parse_delta)]
        delta: Value,
    },
    /// Subtract from a stored number and print the result
    Decr {
        key: String,

        #[arg(default_value = "1", allow_negative_numbers = true, value_parser = parse_delta)]
        delta: Value,
    },
    /// Remove every key of the backend's namespace or database
    Clear,
}

/// Per-command expiry overriding the default TTL
#[derive(clap::Args, Debug, Clone, Default)]
pub struct Expiry {
    /// Expire after this many seconds (0 expires immediately)
    #[arg(short, long, value_name = "SECONDS", conflicts_with = "persist")]
    pub expire: Option<u64>,

    /// Never expire, whatever the default TTL is
    #[arg(long)]
    pub persist: bool,
}
