//! Cache error types.

use thiserror::Error;

use crate::config::ConfigError;

/// Errors that can occur during cache operations.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Invalid configuration, raised while building a cache
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// `incr`/`decr` on a key that is absent or expired
    #[error("'{0}' is not set in the cache")]
    KeyNotSet(String),

    /// `incr`/`decr` called with something other than an integer or a float
    #[error("incr/decr delta must be an integer or a float, got {0}")]
    BadDelta(String),

    /// `incr`/`decr` on a key whose value is not a number
    #[error("value of '{0}' is not a number")]
    NotANumber(String),

    #[error("incrementing '{0}' would overflow")]
    Overflow(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Failure reported by the Redis client, passed through unchanged
    #[error("Cache operation failed: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Cache connection failed: {0}")]
    Connection(String),

    #[error("Cache backend is not connected")]
    NotConnected,

    /// The `get_or_set` fallback failed to produce a value
    #[error("Fallback producer failed: {0}")]
    Producer(#[source] anyhow::Error),
}

impl From<bb8::RunError<redis::RedisError>> for CacheError {
    fn from(error: bb8::RunError<redis::RedisError>) -> Self {
        match error {
            bb8::RunError::User(e) => CacheError::Redis(e),
            bb8::RunError::TimedOut => {
                CacheError::Connection("timed out waiting for a pooled connection".to_string())
            }
        }
    }
}
