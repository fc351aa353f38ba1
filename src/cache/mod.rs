//! Cache module providing a uniform async key/value interface over
//! interchangeable backends.
//!
//! The backend is chosen by the scheme of the connection URL:
//! - `dummy://` stores nothing (useful to switch caching off)
//! - `locmem://[namespace]` keeps entries in process memory
//! - `redis://` / `rediss://` talk to a Redis server through a bb8 pool
//!
//! # Configuration
//!
//! Cache-level options travel in the URL query string or in
//! [`CacheSettings`](crate::config::CacheSettings), which take precedence:
//!
//! ```toml
//! url = "redis://127.0.0.1:6379/1?minsize=1&maxsize=10"
//! ttl = 300
//! version = 2
//! key_prefix = "myapp"
//! ```
//!
//! Every key is stored as `key_prefix:version:key`.
//!
//! # Usage
//!
//! ```ignore
//! let mut cache = Cache::new("locmem://")?;
//! cache.connect().await?;
//! cache.set("x", &json!({"a": [1, 2, 3]})).await?;
//! assert_eq!(cache.get("x").await?, Some(json!({"a": [1, 2, 3]})));
//! cache.disconnect().await?;
//! ```
//!
//! Use the `cached!` macro to define cached functions.

mod codec;
mod error;
mod key;
#[macro_use]
mod macros;
mod manager;
mod memory;
mod namespace;
mod noop;
mod redis;
mod registry;
mod traits;
mod ttl;


pub use codec::{Delta, decode, encode};
pub use error::CacheError;
pub use key::{KeyMaker, Version};
pub use manager::{Cache, Options};
pub use memory::MemoryBackend;
pub use namespace::NamespaceRegistry;
pub use noop::NoOpBackend;
pub use self::redis::RedisBackend;
pub use registry::{BackendFactory, BackendRegistry};
pub use traits::{Backend, Fallback};
pub use ttl::{Ttl, TtlResolver};
