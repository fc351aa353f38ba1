//! Configuration management module for caches
//!
//! A cache is configured by a connection URL plus optional explicit settings:
//! - `url` - selects the backend by scheme and may carry options in its query
//! - explicit settings (`ttl`, `version`, `key_prefix`, pool sizing) which
//!   override the same-named URL options
//!
//! Settings can be built in code or loaded from a TOML file layered under
//! `CACHES_*` environment variables with [`ConfigLoader`].

pub mod error;
pub mod loader;
pub mod settings;
pub mod url;
pub mod validation;

// Re-export public types
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use settings::{CacheOptions, CacheSettings, PoolOptions};
pub use url::CacheUrl;
