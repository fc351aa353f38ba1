//! Cache configuration structures
//!
//! `CacheSettings` is what users write (TOML, environment variables or code).
//! `CacheOptions` is what a cache actually runs with: the settings merged over
//! the options carried in the connection URL, then validated.

use serde::{Deserialize, Serialize};

use crate::cache::Version;
use crate::config::error::ConfigError;
use crate::config::url::CacheUrl;

// ============================================================================
// Default Value Functions
// ============================================================================

fn default_cache_url() -> String {
    "locmem://".to_string()
}

// ============================================================================
// Cache Settings
// ============================================================================

/// User-facing cache configuration.
///
/// Every field except `url` is optional. A field left unset falls back to the
/// same-named query option of the URL; a field that is set always wins over
/// the URL.
///
/// ```toml
/// url = "redis://127.0.0.1:6379/0?maxsize=8"
/// ttl = 300
/// version = 2
/// key_prefix = "myapp"
/// min_size = 2
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Connection URL; its scheme selects the backend
    #[serde(default = "default_cache_url")]
    pub url: String,

    /// Default time-to-live in seconds. `0` is rejected.
    #[serde(default)]
    pub ttl: Option<u64>,

    /// Default key version
    #[serde(default)]
    pub version: Option<Version>,

    /// Prefix for every cache key
    #[serde(default)]
    pub key_prefix: Option<String>,

    /// Minimum number of idle pooled connections (networked backends)
    #[serde(default, alias = "minsize")]
    pub min_size: Option<u32>,

    /// Maximum number of pooled connections (networked backends)
    #[serde(default, alias = "maxsize")]
    pub max_size: Option<u32>,

    /// Seconds to wait for a pooled connection (networked backends)
    #[serde(default)]
    pub connection_timeout: Option<u64>,
}

impl CacheSettings {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ttl: None,
            version: None,
            key_prefix: None,
            min_size: None,
            max_size: None,
            connection_timeout: None,
        }
    }

    pub fn with_ttl(mut self, ttl: u64) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn with_version(mut self, version: impl Into<Version>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_key_prefix(mut self, key_prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(key_prefix.into());
        self
    }

    pub fn with_min_size(mut self, min_size: u32) -> Self {
        self.min_size = Some(min_size);
        self
    }

    pub fn with_max_size(mut self, max_size: u32) -> Self {
        self.max_size = Some(max_size);
        self
    }

    pub fn with_connection_timeout(mut self, seconds: u64) -> Self {
        self.connection_timeout = Some(seconds);
        self
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self::new(default_cache_url())
    }
}

// ============================================================================
// Resolved Options
// ============================================================================

/// Connection pool sizing for networked backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolOptions {
    pub min_size: Option<u32>,
    pub max_size: Option<u32>,
    pub connection_timeout: Option<u64>,
}

/// Fully resolved and validated cache options.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CacheOptions {
    /// Default TTL in seconds; `None` means entries never expire
    pub ttl: Option<u64>,
    pub version: Version,
    pub key_prefix: String,
    pub pool: PoolOptions,
}

impl CacheOptions {
    /// Merge `settings` over the URL's query options and validate the result.
    pub fn resolve(url: &CacheUrl, settings: &CacheSettings) -> Result<Self, ConfigError> {
        let ttl = match settings.ttl {
            Some(ttl) => Some(ttl),
            None => parse_option(url, "ttl")?,
        };

        let version = settings
            .version
            .clone()
            .or_else(|| url.option("version").map(Version::from))
            .unwrap_or_default();

        let key_prefix = settings
            .key_prefix
            .clone()
            .or_else(|| url.option("key_prefix"))
            .unwrap_or_default();

        let pool = PoolOptions {
            min_size: match settings.min_size {
                Some(size) => Some(size),
                None => parse_option(url, "minsize")?,
            },
            max_size: match settings.max_size {
                Some(size) => Some(size),
                None => parse_option(url, "maxsize")?,
            },
            connection_timeout: settings.connection_timeout,
        };

        let options = Self {
            ttl,
            version,
            key_prefix,
            pool,
        };
        options.validate()?;
        Ok(options)
    }
}

/// Parse a numeric URL option, reporting the option name on failure.
fn parse_option<T: std::str::FromStr>(url: &CacheUrl, name: &str) -> Result<Option<T>, ConfigError> {
    url.option(name)
        .map(|raw| {
            raw.parse::<T>().map_err(|_| {
                ConfigError::validation(
                    name,
                    format!("'{}' is not a valid non-negative integer.", raw),
                )
            })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(url: &str, settings: CacheSettings) -> Result<CacheOptions, ConfigError> {
        CacheOptions::resolve(&CacheUrl::parse(url).unwrap(), &settings)
    }

    #[test]
    fn test_defaults_are_empty() {
        let options = resolve("dummy://null", CacheSettings::new("dummy://null")).unwrap();
        assert_eq!(options.ttl, None);
        assert_eq!(options.version.as_str(), "");
        assert_eq!(options.key_prefix, "");
        assert_eq!(options.pool, PoolOptions::default());
    }

    #[test]
    fn test_options_are_read_from_url() {
        let url = "redis://localhost/1?ttl=600&version=2019&key_prefix=prod&minsize=2&maxsize=4";
        let options = resolve(url, CacheSettings::new(url)).unwrap();
        assert_eq!(options.ttl, Some(600));
        assert_eq!(options.version.as_str(), "2019");
        assert_eq!(options.key_prefix, "prod");
        assert_eq!(options.pool.min_size, Some(2));
        assert_eq!(options.pool.max_size, Some(4));
    }

    #[test]
    fn test_explicit_settings_override_url() {
        let url = "redis://localhost/1?ttl=600&version=2019&key_prefix=prod&minsize=2&maxsize=4";
        let settings = CacheSettings::new(url)
            .with_ttl(120)
            .with_version("2020")
            .with_key_prefix("beta")
            .with_min_size(3)
            .with_max_size(5);
        let options = resolve(url, settings).unwrap();
        assert_eq!(options.ttl, Some(120));
        assert_eq!(options.version.as_str(), "2020");
        assert_eq!(options.key_prefix, "beta");
        assert_eq!(options.pool.min_size, Some(3));
        assert_eq!(options.pool.max_size, Some(5));
    }

    #[test]
    fn test_zero_ttl_in_url_is_rejected() {
        let err = resolve("locmem://?ttl=0", CacheSettings::new("locmem://?ttl=0")).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError { ref field, .. } if field == "ttl"));
    }

    #[test]
    fn test_unparsable_option_is_rejected() {
        let url = "redis://localhost?maxsize=lots";
        let err = resolve(url, CacheSettings::new(url)).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError { ref field, .. } if field == "maxsize"));
    }

    #[test]
    fn test_settings_deserialize_with_pool_aliases() {
        let settings: CacheSettings = serde_json::from_value(serde_json::json!({
            "url": "redis://localhost/0",
            "version": 20,
            "minsize": 1,
            "maxsize": 10,
        }))
        .unwrap();
        assert_eq!(settings.version, Some(Version::from(20)));
        assert_eq!(settings.min_size, Some(1));
        assert_eq!(settings.max_size, Some(10));
        assert_eq!(settings.ttl, None);
    }

    #[test]
    fn test_default_settings_use_locmem() {
        assert_eq!(CacheSettings::default().url, "locmem://");
    }
}
