//! Time-to-live resolution.

use std::time::Duration;

use crate::config::ConfigError;
use crate::config::validation::validate_default_ttl;

/// Per-call time-to-live.
///
/// Distinguishes "not given" from "explicitly never expires", which a plain
/// `Option<u64>` cannot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Ttl {
    /// Use the cache's default TTL
    #[default]
    Default,
    /// Never expire, whatever the default is
    Never,
    /// Expire after this many seconds; `0` expires immediately
    Seconds(u64),
}

impl From<u64> for Ttl {
    fn from(seconds: u64) -> Self {
        Ttl::Seconds(seconds)
    }
}

impl From<Duration> for Ttl {
    fn from(duration: Duration) -> Self {
        Ttl::Seconds(duration.as_secs())
    }
}

/// Resolves per-call TTLs against the cache default.
///
/// The resolved TTL is `Option<u64>` seconds: `None` never expires and
/// `Some(0)` expires immediately.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TtlResolver {
    default: Option<u64>,
}

impl TtlResolver {
    /// Fails when `default` is `Some(0)`.
    pub fn new(default: Option<u64>) -> Result<Self, ConfigError> {
        validate_default_ttl(default)?;
        Ok(Self { default })
    }

    pub fn default_ttl(&self) -> Option<u64> {
        self.default
    }

    pub fn resolve(&self, ttl: Ttl) -> Option<u64> {
        match ttl {
            Ttl::Default => self.default,
            Ttl::Never => None,
            Ttl::Seconds(seconds) => Some(seconds),
        }
    }
}
