//! CLI argument validation functions
//!
//! This module provides custom validation functions for CLI arguments
//! that go beyond what clap can validate automatically.

use std::fs;
use std::path::PathBuf;

use serde_json::Value;

/// Validate that a file path is accessible (exists and is readable)
pub fn validate_config_file_path(path_str: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(path_str);

    if !path.exists() {
        return Err(format!("Configuration file does not exist: '{}'", path_str));
    }

    if !path.is_file() {
        return Err(format!("Configuration path is not a file: '{}'", path_str));
    }

    match fs::File::open(&path) {
        Ok(_) => Ok(path),
        Err(e) => Err(format!("Cannot read configuration file '{}': {}", path_str, e)),
    }
}

/// Validate a default TTL, which must be a positive number of seconds
pub fn validate_default_ttl(ttl_str: &str) -> Result<u64, String> {
    let ttl: u64 = ttl_str
        .parse()
        .map_err(|_| format!("TTL must be a number of seconds, got: '{}'", ttl_str))?;

    if ttl == 0 {
        return Err("Default TTL must be greater than 0; omit it to never expire".to_string());
    }

    Ok(ttl)
}

/// Parse a value argument as JSON, falling back to a plain string
///
/// `42`, `true` and `{"a": 1}` keep their JSON type, `hello` becomes the
/// string `"hello"`.
pub fn parse_value(value_str: &str) -> Result<Value, String> {
    Ok(serde_json::from_str(value_str).unwrap_or_else(|_| Value::String(value_str.to_string())))
}

/// Parse an `incr`/`decr` amount, which must be an integer or a float
pub fn parse_delta(delta_str: &str) -> Result<Value, String> {
    match serde_json::from_str::<Value>(delta_str) {
        Ok(value @ Value::Number(_)) => Ok(value),
        _ => Err(format!("Delta must be an integer or a float, got: '{}'", delta_str)),
    }
}
