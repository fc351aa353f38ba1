//! In-process cache implementation (`locmem://`).
//!
//! Entries live in a namespace shared through a [`NamespaceRegistry`].
//! Expiry is lazy: an expired entry stays in the map until an operation
//! visits its key, or the namespace is cleared.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use serde_json::{Number, Value};
use tokio::time::Instant;

use crate::cache::codec::{self, Delta};
use crate::cache::namespace::{CacheEntry, Namespace, NamespaceRegistry, expiry};
use crate::cache::traits::Backend;
use crate::cache::CacheError;
use crate::config::CacheUrl;

/// In-memory cache with per-entry TTL.
pub struct MemoryBackend {
    namespace_id: String,
    registry: NamespaceRegistry,
    store: Option<Arc<Namespace>>,
}

impl MemoryBackend {
    /// Backend for namespace `namespace_id` of `registry`.
    pub fn new(namespace_id: impl Into<String>, registry: NamespaceRegistry) -> Self {
        Self {
            namespace_id: namespace_id.into(),
            registry,
            store: None,
        }
    }

    /// Backend whose namespace is the URL host, or the unnamed namespace.
    pub fn from_url(url: &CacheUrl, registry: NamespaceRegistry) -> Self {
        Self::new(url.hostname().unwrap_or_default(), registry)
    }

    pub fn namespace_id(&self) -> &str {
        &self.namespace_id
    }

    fn store(&self) -> Result<&Namespace, CacheError> {
        self.store.as_deref().ok_or(CacheError::NotConnected)
    }

    /// Decoded value of a live entry; drops the entry if it has expired.
    fn read(store: &Namespace, key: &str, now: Instant) -> Result<Option<Value>, CacheError> {
        match store.entry(key.to_string()) {
            Entry::Occupied(entry) if entry.get().is_expired(now) => {
                entry.remove();
                Ok(None)
            }
            Entry::Occupied(entry) => codec::decode(&entry.get().encoded).map(Some),
            Entry::Vacant(_) => Ok(None),
        }
    }
}

impl Drop for MemoryBackend {
    fn drop(&mut self) {
        // A backend dropped while connected still leaves its namespace
        if self.store.take().is_some() {
            self.registry.release(&self.namespace_id);
        }
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    fn name(&self) -> &'static str {
        "locmem"
    }

    async fn connect(&mut self) -> Result<(), CacheError> {
        self.store = Some(self.registry.acquire(&self.namespace_id));
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), CacheError> {
        if self.store.take().is_some() {
            self.registry.release(&self.namespace_id);
        }
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
        Self::read(self.store()?, key, Instant::now())
    }

    async fn set(&self, key: &str, value: &Value, ttl: Option<u64>) -> Result<(), CacheError> {
        let store = self.store()?;
        let encoded = codec::encode(value)?;
        store.insert(key.to_string(), CacheEntry::new(encoded, ttl, Instant::now()));
        Ok(())
    }

    async fn add(&self, key: &str, value: &Value, ttl: Option<u64>) -> Result<bool, CacheError> {
        let store = self.store()?;
        let encoded = codec::encode(value)?;
        let now = Instant::now();

        // The entry guard holds the shard lock, so check and write are atomic
        match store.entry(key.to_string()) {
            Entry::Occupied(entry) if !entry.get().is_expired(now) => Ok(false),
            Entry::Occupied(mut entry) => {
                entry.insert(CacheEntry::new(encoded, ttl, now));
                Ok(true)
            }
            Entry::Vacant(entry) => {
                entry.insert(CacheEntry::new(encoded, ttl, now));
                Ok(true)
            }
        }
    }

    async fn get_many(&self, keys: &[String]) -> Result<HashMap<String, Option<Value>>, CacheError> {
        let store = self.store()?;
        let now = Instant::now();
        keys.iter()
            .map(|key| Ok::<_, CacheError>((key.clone(), Self::read(store, key, now)?)))
            .collect()
    }

    async fn set_many(&self, entries: &[(String, Value)], ttl: Option<u64>) -> Result<(), CacheError> {
        let store = self.store()?;
        // Encode everything first so a bad value writes nothing
        let encoded = entries
            .iter()
            .map(|(key, value)| Ok::<_, CacheError>((key, codec::encode(value)?)))
            .collect::<Result<Vec<_>, CacheError>>()?;

        let now = Instant::now();
        for (key, value) in encoded {
            store.insert(key.clone(), CacheEntry::new(value, ttl, now));
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.store()?.remove(key);
        Ok(())
    }

    async fn delete_many(&self, keys: &[String]) -> Result<(), CacheError> {
        let store = self.store()?;
        for key in keys {
            store.remove(key);
        }
        Ok(())
    }

    async fn clear(&self) -> Result<(), CacheError> {
        self.store()?.clear();
        Ok(())
    }

    async fn touch(&self, key: &str, ttl: Option<u64>) -> Result<bool, CacheError> {
        let store = self.store()?;
        let now = Instant::now();

        match store.entry(key.to_string()) {
            Entry::Occupied(entry) if entry.get().is_expired(now) => {
                entry.remove();
                Ok(false)
            }
            Entry::Occupied(mut entry) => {
                entry.get_mut().expires_at = expiry(ttl, now);
                Ok(true)
            }
            Entry::Vacant(_) => Ok(false),
        }
    }

    async fn incr(&self, key: &str, delta: Delta) -> Result<Number, CacheError> {
        let store = self.store()?;
        let now = Instant::now();

        match store.entry(key.to_string()) {
            Entry::Occupied(entry) if entry.get().is_expired(now) => {
                entry.remove();
                Err(CacheError::KeyNotSet(key.to_string()))
            }
            Entry::Occupied(mut entry) => {
                let (next, encoded) = codec::increment(key, &entry.get().encoded, delta)?;
                entry.get_mut().encoded = encoded;
                Ok(next)
            }
            Entry::Vacant(_) => Err(CacheError::KeyNotSet(key.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    async fn connected(id: &str, registry: &NamespaceRegistry) -> MemoryBackend {
        let mut backend = MemoryBackend::new(id, registry.clone());
        backend.connect().await.unwrap();
        backend
    }

    #[tokio::test]
    async fn test_operations_require_connect() {
        let backend = MemoryBackend::new("", NamespaceRegistry::new());
        assert!(matches!(backend.get("k").await, Err(CacheError::NotConnected)));
    }

    #[tokio::test]
    async fn test_namespace_is_taken_from_url_host() {
        let registry = NamespaceRegistry::new();
        let url = CacheUrl::parse("locmem://primary").unwrap();
        assert_eq!(MemoryBackend::from_url(&url, registry.clone()).namespace_id(), "primary");
        let url = CacheUrl::parse("locmem://").unwrap();
        assert_eq!(MemoryBackend::from_url(&url, registry).namespace_id(), "");
    }

    #[tokio::test]
    async fn test_backends_in_same_namespace_share_entries() {
        let registry = NamespaceRegistry::new();
        let first = connected("shared", &registry).await;
        let second = connected("shared", &registry).await;

        first.set("k", &json!("v"), None).await.unwrap();
        assert_eq!(second.get("k").await.unwrap(), Some(json!("v")));
    }

    #[tokio::test]
    async fn test_reconnect_after_last_disconnect_is_empty() {
        let registry = NamespaceRegistry::new();
        let mut backend = connected("solo", &registry).await;
        backend.set("k", &json!(1), None).await.unwrap();
        backend.disconnect().await.unwrap();

        backend.connect().await.unwrap();
        assert_eq!(backend.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_drop_while_connected_releases_namespace() {
        let registry = NamespaceRegistry::new();
        let first = connected("dropped", &registry).await;
        let second = connected("dropped", &registry).await;

        drop(first);
        assert!(registry.contains("dropped"));
        drop(second);
        assert!(!registry.contains("dropped"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire_after_ttl() {
        let registry = NamespaceRegistry::new();
        let backend = connected("ttl", &registry).await;
        backend.set("k", &json!("v"), Some(10)).await.unwrap();

        tokio::time::advance(Duration::from_secs(9)).await;
        assert_eq!(backend.get("k").await.unwrap(), Some(json!("v")));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(backend.get("k").await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entries_are_removed_lazily() {
        let registry = NamespaceRegistry::new();
        let backend = connected("lazy", &registry).await;
        backend.set("k", &json!(1), Some(1)).await.unwrap();
        tokio::time::advance(Duration::from_secs(2)).await;

        let store = backend.store().unwrap();
        assert!(store.contains_key("k"));
        assert_eq!(backend.get("k").await.unwrap(), None);
        assert!(!store.contains_key("k"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_touch_extends_expiry() {
        let registry = NamespaceRegistry::new();
        let backend = connected("touch", &registry).await;
        backend.set("k", &json!(1), Some(5)).await.unwrap();

        tokio::time::advance(Duration::from_secs(4)).await;
        assert!(backend.touch("k", Some(10)).await.unwrap());

        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(backend.get("k").await.unwrap(), Some(json!(1)));

        assert!(backend.touch("k", None).await.unwrap());
        tokio::time::advance(Duration::from_secs(3600)).await;
        assert_eq!(backend.get("k").await.unwrap(), Some(json!(1)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_incr_keeps_expiry() {
        let registry = NamespaceRegistry::new();
        let backend = connected("incr", &registry).await;
        backend.set("n", &json!(1), Some(5)).await.unwrap();
        assert_eq!(backend.incr("n", Delta::Int(1)).await.unwrap(), Number::from(2));

        tokio::time::advance(Duration::from_secs(5)).await;
        assert!(matches!(
            backend.incr("n", Delta::Int(1)).await,
            Err(CacheError::KeyNotSet(_))
        ));
    }

    #[tokio::test]
    async fn test_concurrent_add_has_single_winner() {
        let registry = NamespaceRegistry::new();
        let backend = Arc::new(connected("race", &registry).await);

        let tasks: Vec<_> = (0..16)
            .map(|i| {
                let backend = Arc::clone(&backend);
                tokio::spawn(async move { backend.add("k", &json!(i), None).await.unwrap() })
            })
            .collect();

        let mut winners = 0;
        for task in tasks {
            if task.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn test_concurrent_incr_loses_no_updates() {
        let registry = NamespaceRegistry::new();
        let backend = Arc::new(connected("counter", &registry).await);
        backend.set("n", &json!(0), None).await.unwrap();

        let tasks: Vec<_> = (0..50)
            .map(|_| {
                let backend = Arc::clone(&backend);
                tokio::spawn(async move { backend.incr("n", Delta::Int(1)).await.unwrap() })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(backend.get("n").await.unwrap(), Some(json!(50)));
    }
}
