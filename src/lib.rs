//! caches
//!
//! A uniform async key/value cache interface over interchangeable backends
//! (`dummy`, `locmem`, `redis`), selected by connection URL.

use shadow_rs::shadow;
shadow!(build);

pub mod cache;
pub mod cli;
pub mod config;
pub mod logger;

pub use cache::{Cache, CacheError, Options, Ttl, Version};
pub use config::{CacheSettings, ConfigError};

pub fn pkg_version() -> &'static str {
    build::PKG_VERSION
}

pub fn clap_long_version() -> &'static str {
    build::CLAP_LONG_VERSION
}
