//! Backend selection by URL scheme.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::cache::memory::MemoryBackend;
use crate::cache::namespace::NamespaceRegistry;
use crate::cache::noop::NoOpBackend;
use crate::cache::redis::RedisBackend;
use crate::cache::traits::Backend;
use crate::cache::CacheError;
use crate::config::{CacheOptions, CacheUrl, ConfigError};

/// Builds a backend for a parsed URL and its resolved options.
pub type BackendFactory =
    Arc<dyn Fn(&CacheUrl, &CacheOptions) -> Result<Box<dyn Backend>, CacheError> + Send + Sync>;

/// Maps URL schemes to backend factories.
#[derive(Clone)]
pub struct BackendRegistry {
    factories: HashMap<String, BackendFactory>,
}

impl BackendRegistry {
    /// Registry with the built-in schemes, using the global locmem namespaces.
    pub fn new() -> Self {
        Self::with_namespaces(NamespaceRegistry::global())
    }

    /// Registry with the built-in schemes, keeping locmem namespaces in
    /// `namespaces`.
    pub fn with_namespaces(namespaces: NamespaceRegistry) -> Self {
        let mut registry = Self {
            factories: HashMap::new(),
        };

        registry.register("dummy", |_, _| Ok(Box::new(NoOpBackend::new()) as Box<dyn Backend>));
        registry.register("locmem", move |url, _| {
            Ok(Box::new(MemoryBackend::from_url(url, namespaces.clone())) as Box<dyn Backend>)
        });
        for scheme in ["redis", "rediss"] {
            registry.register(scheme, |url, options| {
                Ok(Box::new(RedisBackend::new(url, options.pool)) as Box<dyn Backend>)
            });
        }
        registry
    }

    /// Add or replace the factory for `scheme`.
    pub fn register<F>(&mut self, scheme: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&CacheUrl, &CacheOptions) -> Result<Box<dyn Backend>, CacheError> + Send + Sync + 'static,
    {
        self.factories.insert(scheme.into(), Arc::new(factory));
        self
    }

    pub fn supports(&self, scheme: &str) -> bool {
        self.factories.contains_key(scheme)
    }

    /// Registered schemes, sorted.
    pub fn schemes(&self) -> Vec<&str> {
        let mut schemes: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        schemes.sort_unstable();
        schemes
    }

    /// Build the backend selected by the URL scheme.
    pub fn create(&self, url: &CacheUrl, options: &CacheOptions) -> Result<Box<dyn Backend>, CacheError> {
        let factory = self
            .factories
            .get(url.backend())
            .ok_or_else(|| ConfigError::UnknownBackend(url.backend().to_string()))?;
        factory(url, options)
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("schemes", &self.schemes())
            .finish()
    }
}
