//! Configuration merger for CLI arguments and config files
//!
//! This module handles merging CLI argument overrides with file-based configuration,
//! implementing the configuration precedence logic.

use std::path::Path;

use super::parser::Cli;
use crate::config::{CacheSettings, ConfigError, ConfigLoader};

/// Configuration merger that handles CLI argument integration with file-based configuration
///
/// CLI arguments override configuration file and environment values.
#[derive(Debug)]
pub struct ConfigurationMerger {
    base_config: CacheSettings,
}

impl ConfigurationMerger {
    /// Create a new configuration merger with base configuration
    pub fn new(base_config: CacheSettings) -> Self {
        Self { base_config }
    }

    /// Load the base configuration from `config_path`, or from the file named
    /// by `CACHES_CONFIG_FILE` when no path is given
    pub fn from_config_path(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let loader = match config_path {
            Some(path) => ConfigLoader::from_file(path),
            None => ConfigLoader::new(),
        };
        Ok(Self::new(loader.load()?))
    }

    pub fn base_config(&self) -> &CacheSettings {
        &self.base_config
    }

    /// Apply CLI overrides to the base configuration
    pub fn merge_cli_args(&self, cli: &Cli) -> CacheSettings {
        let mut settings = self.base_config.clone();

        if let Some(url) = &cli.url {
            settings.url = url.clone();
        }
        if let Some(prefix) = &cli.prefix {
            settings.key_prefix = Some(prefix.clone());
        }
        if let Some(version) = &cli.cache_version {
            settings = settings.with_version(version);
        }
        if let Some(ttl) = cli.ttl {
            settings = settings.with_ttl(ttl);
        }

        settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::Version;
    use crate::config::loader::tests::TEST_MUTEX;
    use clap::Parser;
    use std::io::Write;

    #[test]
    fn test_cli_args_override_file_values() {
        let _guard = TEST_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "url = \"dummy://\"\nkey_prefix = \"file\"\nttl = 30").unwrap();

        let merger = ConfigurationMerger::from_config_path(Some(file.path())).unwrap();
        assert_eq!(merger.base_config().url, "dummy://");

        let cli = Cli::try_parse_from(["caches", "--prefix", "cli", "--cache-version", "7", "clear"]).unwrap();
        let settings = merger.merge_cli_args(&cli);
        assert_eq!(settings.url, "dummy://");
        assert_eq!(settings.key_prefix.as_deref(), Some("cli"));
        assert_eq!(settings.version, Some(Version::from("7")));
        assert_eq!(settings.ttl, Some(30));
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        let result = ConfigurationMerger::from_config_path(Some(Path::new("/nonexistent/caches.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_no_overrides_keeps_base() {
        let merger = ConfigurationMerger::new(CacheSettings::new("locmem://base").with_ttl(5));
        let cli = Cli::try_parse_from(["caches", "clear"]).unwrap();
        assert_eq!(merger.merge_cli_args(&cli), CacheSettings::new("locmem://base").with_ttl(5));
    }
}
