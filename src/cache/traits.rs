//! Backend trait definition.

use std::collections::HashMap;
use std::future::Future;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::{Number, Value};

use crate::cache::CacheError;
use crate::cache::codec::Delta;

/// Value used by `get_or_set` when the key is missing.
///
/// Closures and futures are only evaluated on a miss, and at most once per
/// call.
pub enum Fallback<'a> {
    Value(Value),
    Call(Box<dyn FnOnce() -> anyhow::Result<Value> + Send + 'a>),
    Task(BoxFuture<'a, anyhow::Result<Value>>),
}

impl<'a> Fallback<'a> {
    pub fn call<F>(producer: F) -> Self
    where
        F: FnOnce() -> anyhow::Result<Value> + Send + 'a,
    {
        Fallback::Call(Box::new(producer))
    }

    pub fn task<F>(future: F) -> Self
    where
        F: Future<Output = anyhow::Result<Value>> + Send + 'a,
    {
        Fallback::Task(Box::pin(future))
    }

    /// Produce the value, running the closure or awaiting the future.
    pub async fn resolve(self) -> Result<Value, CacheError> {
        match self {
            Fallback::Value(value) => Ok(value),
            Fallback::Call(producer) => producer().map_err(CacheError::Producer),
            Fallback::Task(future) => future.await.map_err(CacheError::Producer),
        }
    }
}

impl From<Value> for Fallback<'_> {
    fn from(value: Value) -> Self {
        Fallback::Value(value)
    }
}

/// Trait for cache backends.
///
/// Backends work on effective keys (already prefixed and versioned) and
/// resolved TTLs: `None` never expires, `Some(0)` expires immediately.
/// Expired keys behave exactly like absent ones.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Short backend name used in logs.
    fn name(&self) -> &'static str;

    /// Open the backend. Never called twice without a `disconnect` between.
    async fn connect(&mut self) -> Result<(), CacheError>;

    async fn disconnect(&mut self) -> Result<(), CacheError>;

    /// Get a value, `None` when absent or expired.
    async fn get(&self, key: &str) -> Result<Option<Value>, CacheError>;

    /// Write a value, replacing any existing value and expiry.
    async fn set(&self, key: &str, value: &Value, ttl: Option<u64>) -> Result<(), CacheError>;

    /// Write a value only if the key is absent or expired.
    ///
    /// Returns whether the write happened. Atomic for concurrent callers of
    /// the same backend.
    async fn add(&self, key: &str, value: &Value, ttl: Option<u64>) -> Result<bool, CacheError>;

    /// Return the stored value, or store and return the fallback.
    ///
    /// Not atomic: two concurrent misses may both produce and both write.
    async fn get_or_set(
        &self,
        key: &str,
        fallback: Fallback<'_>,
        ttl: Option<u64>,
    ) -> Result<Value, CacheError> {
        if let Some(value) = self.get(key).await? {
            return Ok(value);
        }
        let value = fallback.resolve().await?;
        self.set(key, &value, ttl).await?;
        Ok(value)
    }

    /// Get several values. The result holds exactly the requested keys.
    async fn get_many(&self, keys: &[String]) -> Result<HashMap<String, Option<Value>>, CacheError>;

    async fn set_many(&self, entries: &[(String, Value)], ttl: Option<u64>) -> Result<(), CacheError>;

    /// Remove a key. Absent keys are ignored.
    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    async fn delete_many(&self, keys: &[String]) -> Result<(), CacheError>;

    /// Remove every key of this backend's namespace.
    async fn clear(&self) -> Result<(), CacheError>;

    /// Replace the expiry of an existing key. Returns whether the key existed.
    async fn touch(&self, key: &str, ttl: Option<u64>) -> Result<bool, CacheError>;

    /// Add `delta` to a stored number.
    ///
    /// Fails with [`CacheError::KeyNotSet`] when the key is absent or expired.
    async fn incr(&self, key: &str, delta: Delta) -> Result<Number, CacheError>;

    async fn decr(&self, key: &str, delta: Delta) -> Result<Number, CacheError> {
        self.incr(key, delta.negated(key)?).await
    }
}
