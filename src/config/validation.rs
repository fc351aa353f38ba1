//! Configuration validation logic
//!
//! Validation happens once, when a cache is constructed. A cache never exists
//! with options that fail these rules.

use crate::config::error::ConfigError;
use crate::config::settings::{CacheOptions, PoolOptions};

/// Reject a default TTL of zero.
///
/// A zero TTL means "expire immediately"; as a cache-wide default it would
/// turn every write into a no-op.
pub(crate) fn validate_default_ttl(ttl: Option<u64>) -> Result<(), ConfigError> {
    if ttl == Some(0) {
        return Err(ConfigError::validation(
            "ttl",
            "Default TTL must be greater than 0 seconds. Leave it unset for entries that never expire.",
        ));
    }
    Ok(())
}

impl PoolOptions {
    /// Validate connection pool options
    ///
    /// # Validation Rules
    /// - Max size must be greater than 0
    /// - Min size must not exceed max size
    /// - Connection timeout must be greater than 0
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_size == Some(0) {
            return Err(ConfigError::validation(
                "maxsize",
                "Max pool size must be greater than 0.",
            ));
        }

        if let (Some(min), Some(max)) = (self.min_size, self.max_size)
            && min > max
        {
            return Err(ConfigError::validation(
                "minsize",
                format!("Min pool size ({}) cannot exceed max pool size ({}).", min, max),
            ));
        }

        if self.connection_timeout == Some(0) {
            return Err(ConfigError::validation(
                "connection_timeout",
                "Connection timeout must be greater than 0 seconds.",
            ));
        }

        Ok(())
    }
}

impl CacheOptions {
    /// Validate resolved cache options
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_default_ttl(self.ttl)?;
        self.pool.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ttl_rules() {
        assert!(validate_default_ttl(None).is_ok());
        assert!(validate_default_ttl(Some(1)).is_ok());
        assert!(validate_default_ttl(Some(0)).is_err());
    }

    #[test]
    fn test_pool_min_cannot_exceed_max() {
        let pool = PoolOptions {
            min_size: Some(5),
            max_size: Some(2),
            connection_timeout: None,
        };
        let err = pool.validate().unwrap_err();
        assert!(err.to_string().contains("cannot exceed"));
    }

    #[test]
    fn test_pool_max_size_must_be_positive() {
        let pool = PoolOptions {
            max_size: Some(0),
            ..PoolOptions::default()
        };
        assert!(pool.validate().is_err());
    }

    #[test]
    fn test_pool_connection_timeout_must_be_positive() {
        let pool = PoolOptions {
            connection_timeout: Some(0),
            ..PoolOptions::default()
        };
        assert!(pool.validate().is_err());
    }

    #[test]
    fn test_empty_pool_options_are_valid() {
        assert!(PoolOptions::default().validate().is_ok());
        assert!(CacheOptions::default().validate().is_ok());
    }
}
