//! Cache facade that dispatches to the configured backend.

use std::collections::HashMap;
use std::fmt;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use futures::future::BoxFuture;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Number, Value};
use tracing::{info, warn};

use crate::cache::codec::Delta;
use crate::cache::key::{KeyMaker, Version};
use crate::cache::registry::BackendRegistry;
use crate::cache::traits::{Backend, Fallback};
use crate::cache::ttl::{Ttl, TtlResolver};
use crate::cache::CacheError;
use crate::config::{CacheOptions, CacheSettings, CacheUrl};

/// Per-call overrides of the cache defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Options {
    pub ttl: Ttl,
    /// Replaces the default version when set, even with an empty version
    pub version: Option<Version>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(mut self, ttl: impl Into<Ttl>) -> Self {
        self.ttl = ttl.into();
        self
    }

    /// Store without expiry, whatever the default TTL is.
    pub fn never_expire(mut self) -> Self {
        self.ttl = Ttl::Never;
        self
    }

    pub fn with_version(mut self, version: impl Into<Version>) -> Self {
        self.version = Some(version.into());
        self
    }
}

/// Uniform cache interface over a pluggable backend.
///
/// A cache starts disconnected. [`Cache::connect`] and [`Cache::disconnect`]
/// must alternate; calling either twice in a row panics. Once connected, the
/// cache can be shared (for instance behind an `Arc`) and used concurrently.
///
/// ```ignore
/// let mut cache = Cache::new("locmem://?key_prefix=app&ttl=300")?;
/// cache.connect().await?;
/// cache.set("user:1", &json!({"name": "ferris"})).await?;
/// let user = cache.get("user:1").await?;
/// cache.disconnect().await?;
/// ```
pub struct Cache {
    url: CacheUrl,
    options: CacheOptions,
    keys: KeyMaker,
    ttl: TtlResolver,
    backend: Box<dyn Backend>,
    connected: bool,
}

impl Cache {
    /// Create a cache from a connection URL using the built-in backends.
    pub fn new(url: &str) -> Result<Self, CacheError> {
        Self::from_settings(CacheSettings::new(url))
    }

    pub fn from_settings(settings: CacheSettings) -> Result<Self, CacheError> {
        Self::with_registry(settings, &BackendRegistry::new())
    }

    /// Create a cache, looking the URL scheme up in `registry`.
    pub fn with_registry(settings: CacheSettings, registry: &BackendRegistry) -> Result<Self, CacheError> {
        let url = CacheUrl::parse(&settings.url)?;
        let options = CacheOptions::resolve(&url, &settings)?;
        let keys = KeyMaker::new(options.key_prefix.clone(), options.version.clone());
        let ttl = TtlResolver::new(options.ttl)?;
        let backend = registry.create(&url, &options)?;

        Ok(Self {
            url,
            options,
            keys,
            ttl,
            backend,
            connected: false,
        })
    }

    pub fn url(&self) -> &CacheUrl {
        &self.url
    }

    pub fn options(&self) -> &CacheOptions {
        &self.options
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Connect the backend.
    ///
    /// # Panics
    ///
    /// If the cache is already connected.
    pub async fn connect(&mut self) -> Result<(), CacheError> {
        assert!(!self.connected, "Already connected.");
        self.backend.connect().await?;
        self.connected = true;
        info!(backend = self.backend.name(), "cache connected");
        Ok(())
    }

    /// Disconnect the backend.
    ///
    /// The cache counts as disconnected afterwards even if the backend
    /// reports an error.
    ///
    /// # Panics
    ///
    /// If the cache is not connected.
    pub async fn disconnect(&mut self) -> Result<(), CacheError> {
        assert!(self.connected, "Already disconnected.");
        self.connected = false;
        self.backend.disconnect().await?;
        info!(backend = self.backend.name(), "cache disconnected");
        Ok(())
    }

    /// Run `body` against a connected cache, disconnecting on every exit.
    ///
    /// The cache is disconnected after `body` returns `Ok`, returns `Err` or
    /// panics; a panic is resumed once the cache is disconnected.
    ///
    /// ```ignore
    /// let hits = cache
    ///     .scoped(|cache| {
    ///         async move { cache.incr("hits", 1).await }.boxed()
    ///     })
    ///     .await?;
    /// ```
    pub async fn scoped<T, E, F>(&mut self, body: F) -> Result<T, E>
    where
        F: for<'c> FnOnce(&'c Cache) -> BoxFuture<'c, Result<T, E>>,
        E: From<CacheError>,
    {
        self.connect().await?;
        let outcome = AssertUnwindSafe(body(&*self)).catch_unwind().await;
        let disconnected = self.disconnect().await;

        match outcome {
            Ok(result) => {
                if let Err(error) = disconnected {
                    if result.is_ok() {
                        return Err(error.into());
                    }
                    warn!(error = %error, "failed to disconnect cache after scoped error");
                }
                result
            }
            Err(panic) => {
                if let Err(error) = disconnected {
                    warn!(error = %error, "failed to disconnect cache after scoped panic");
                }
                std::panic::resume_unwind(panic)
            }
        }
    }

    // ========================================================================
    // Keys and TTLs
    // ========================================================================

    /// Effective key for `key`, as handed to the backend.
    pub fn make_key(&self, key: &str, version: Option<&Version>) -> String {
        self.keys.make_key(key, version)
    }

    /// Backend TTL for a per-call TTL: `None` never expires.
    pub fn resolve_ttl(&self, ttl: Ttl) -> Option<u64> {
        self.ttl.resolve(ttl)
    }

    fn key(&self, key: &str, options: &Options) -> String {
        self.keys.make_key(key, options.version.as_ref())
    }

    // ========================================================================
    // Operations
    // ========================================================================

    /// Get a value, `None` when the key is absent or expired.
    pub async fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
        self.get_with(key, &Options::default()).await
    }

    pub async fn get_with(&self, key: &str, options: &Options) -> Result<Option<Value>, CacheError> {
        self.backend.get(&self.key(key, options)).await
    }

    /// Get a value, or `default` when the key is absent or expired.
    pub async fn get_or(&self, key: &str, default: impl Into<Value>) -> Result<Value, CacheError> {
        self.get_or_with(key, default, &Options::default()).await
    }

    pub async fn get_or_with(
        &self,
        key: &str,
        default: impl Into<Value>,
        options: &Options,
    ) -> Result<Value, CacheError> {
        Ok(self.get_with(key, options).await?.unwrap_or_else(|| default.into()))
    }

    /// Get a value and deserialize it into `T`.
    pub async fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        self.get_as_with(key, &Options::default()).await
    }

    pub async fn get_as_with<T: DeserializeOwned>(
        &self,
        key: &str,
        options: &Options,
    ) -> Result<Option<T>, CacheError> {
        match self.get_with(key, options).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Store a value under the default TTL.
    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), CacheError> {
        self.set_with(key, value, &Options::default()).await
    }

    pub async fn set_with<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        options: &Options,
    ) -> Result<(), CacheError> {
        let value = serde_json::to_value(value)?;
        self.backend
            .set(&self.key(key, options), &value, self.resolve_ttl(options.ttl))
            .await
    }

    /// Store a value only if the key is absent. Returns whether it was stored.
    pub async fn add<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<bool, CacheError> {
        self.add_with(key, value, &Options::default()).await
    }

    pub async fn add_with<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        options: &Options,
    ) -> Result<bool, CacheError> {
        let value = serde_json::to_value(value)?;
        self.backend
            .add(&self.key(key, options), &value, self.resolve_ttl(options.ttl))
            .await
    }

    /// Get a value, or store and return the fallback on a miss.
    ///
    /// A closure or future fallback only runs on a miss. Two concurrent
    /// misses may both run their fallback.
    pub async fn get_or_set<'a>(
        &self,
        key: &str,
        fallback: impl Into<Fallback<'a>>,
    ) -> Result<Value, CacheError> {
        self.get_or_set_with(key, fallback, &Options::default()).await
    }

    pub async fn get_or_set_with<'a>(
        &self,
        key: &str,
        fallback: impl Into<Fallback<'a>>,
        options: &Options,
    ) -> Result<Value, CacheError> {
        self.backend
            .get_or_set(&self.key(key, options), fallback.into(), self.resolve_ttl(options.ttl))
            .await
    }

    /// Get several values, keyed by the keys as given.
    pub async fn get_many<K: AsRef<str>>(&self, keys: &[K]) -> Result<HashMap<String, Option<Value>>, CacheError> {
        self.get_many_with(keys, &Options::default()).await
    }

    pub async fn get_many_with<K: AsRef<str>>(
        &self,
        keys: &[K],
        options: &Options,
    ) -> Result<HashMap<String, Option<Value>>, CacheError> {
        let effective: Vec<String> = keys.iter().map(|key| self.key(key.as_ref(), options)).collect();
        let found = self.backend.get_many(&effective).await?;

        Ok(keys
            .iter()
            .zip(&effective)
            .map(|(key, effective)| {
                let value = found.get(effective).cloned().flatten();
                (key.as_ref().to_string(), value)
            })
            .collect())
    }

    /// Store several values with the same TTL.
    pub async fn set_many<I, K, V>(&self, entries: I) -> Result<(), CacheError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Serialize,
    {
        self.set_many_with(entries, &Options::default()).await
    }

    pub async fn set_many_with<I, K, V>(&self, entries: I, options: &Options) -> Result<(), CacheError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Serialize,
    {
        let entries = entries
            .into_iter()
            .map(|(key, value)| Ok::<_, CacheError>((self.key(key.as_ref(), options), serde_json::to_value(value)?)))
            .collect::<Result<Vec<_>, CacheError>>()?;
        self.backend.set_many(&entries, self.resolve_ttl(options.ttl)).await
    }

    /// Remove a key; absent keys are ignored.
    pub async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.delete_with(key, &Options::default()).await
    }

    pub async fn delete_with(&self, key: &str, options: &Options) -> Result<(), CacheError> {
        self.backend.delete(&self.key(key, options)).await
    }

    pub async fn delete_many<K: AsRef<str>>(&self, keys: &[K]) -> Result<(), CacheError> {
        self.delete_many_with(keys, &Options::default()).await
    }

    pub async fn delete_many_with<K: AsRef<str>>(&self, keys: &[K], options: &Options) -> Result<(), CacheError> {
        let effective: Vec<String> = keys.iter().map(|key| self.key(key.as_ref(), options)).collect();
        self.backend.delete_many(&effective).await
    }

    /// Remove every entry of the backend's namespace or database.
    pub async fn clear(&self) -> Result<(), CacheError> {
        self.backend.clear().await
    }

    /// Reset the expiry of an existing key to the default TTL.
    pub async fn touch(&self, key: &str) -> Result<bool, CacheError> {
        self.touch_with(key, &Options::default()).await
    }

    pub async fn touch_with(&self, key: &str, options: &Options) -> Result<bool, CacheError> {
        self.backend
            .touch(&self.key(key, options), self.resolve_ttl(options.ttl))
            .await
    }

    /// Add `delta` to a stored number and return the result.
    ///
    /// `delta` must be an integer or a float; anything else fails with
    /// [`CacheError::BadDelta`].
    pub async fn incr(&self, key: &str, delta: impl Into<Value>) -> Result<Number, CacheError> {
        self.incr_with(key, delta, &Options::default()).await
    }

    pub async fn incr_with(&self, key: &str, delta: impl Into<Value>, options: &Options) -> Result<Number, CacheError> {
        let delta = Delta::try_from(delta.into())?;
        self.backend.incr(&self.key(key, options), delta).await
    }

    /// Subtract `delta` from a stored number and return the result.
    pub async fn decr(&self, key: &str, delta: impl Into<Value>) -> Result<Number, CacheError> {
        self.decr_with(key, delta, &Options::default()).await
    }

    pub async fn decr_with(&self, key: &str, delta: impl Into<Value>, options: &Options) -> Result<Number, CacheError> {
        let delta = Delta::try_from(delta.into())?;
        self.backend.decr(&self.key(key, options), delta).await
    }
}

impl fmt::Debug for Cache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cache")
            .field("backend", &self.backend.name())
            .field("key_prefix", &self.keys.prefix())
            .field("version", &self.keys.version())
            .field("ttl", &self.ttl.default_ttl())
            .field("connected", &self.connected)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_url_options_configure_keys_and_ttl() {
        let cache = Cache::new("dummy://?key_prefix=app&version=3&ttl=60").unwrap();
        assert_eq!(cache.make_key("k", None), "app:3:k");
        assert_eq!(cache.make_key("k", Some(&Version::from("beta"))), "app:beta:k");
        assert_eq!(cache.resolve_ttl(Ttl::Default), Some(60));
        assert_eq!(cache.resolve_ttl(Ttl::Never), None);
        assert_eq!(cache.backend_name(), "dummy");
    }

    #[test]
    fn test_settings_override_url_options() {
        let settings = CacheSettings::new("dummy://?key_prefix=url&ttl=60")
            .with_key_prefix("explicit")
            .with_ttl(5);
        let cache = Cache::from_settings(settings).unwrap();
        assert_eq!(cache.make_key("k", None), "explicit::k");
        assert_eq!(cache.resolve_ttl(Ttl::Default), Some(5));
    }

    #[test]
    fn test_zero_default_ttl_is_rejected() {
        assert!(matches!(Cache::new("locmem://?ttl=0"), Err(CacheError::Config(_))));
        let settings = CacheSettings::new("locmem://").with_ttl(0);
        assert!(matches!(Cache::from_settings(settings), Err(CacheError::Config(_))));
    }

    #[test]
    fn test_options_builder() {
        let options = Options::new().with_ttl(10u64).with_version("v2");
        assert_eq!(options.ttl, Ttl::Seconds(10));
        assert_eq!(options.version, Some(Version::from("v2")));
        assert_eq!(Options::new().never_expire().ttl, Ttl::Never);
    }

    #[tokio::test]
    async fn test_starts_disconnected() {
        let mut cache = Cache::new("dummy://").unwrap();
        assert!(!cache.is_connected());
        cache.connect().await.unwrap();
        assert!(cache.is_connected());
        cache.disconnect().await.unwrap();
        assert!(!cache.is_connected());
    }

    #[tokio::test]
    async fn test_bad_delta_is_rejected_before_backend() {
        let cache = Cache::new("dummy://").unwrap();
        assert!(matches!(cache.incr("k", "1").await, Err(CacheError::BadDelta(_))));
        assert!(matches!(cache.decr("k", json!([1])).await, Err(CacheError::BadDelta(_))));
    }

    #[test]
    fn test_debug_shows_configuration() {
        let cache = Cache::new("dummy://?key_prefix=app").unwrap();
        let debug = format!("{:?}", cache);
        assert!(debug.contains("dummy"));
        assert!(debug.contains("app"));
    }
}
