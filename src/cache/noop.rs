//! NoOp cache implementation.
//!
//! Selected with the `dummy://` scheme. Values are encoded so serialization
//! problems still surface, then dropped.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::{Number, Value};

use crate::cache::codec::{self, Delta};
use crate::cache::traits::{Backend, Fallback};
use crate::cache::CacheError;

/// A no-operation cache that doesn't store anything.
#[derive(Debug, Default)]
pub struct NoOpBackend;

impl NoOpBackend {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Backend for NoOpBackend {
    fn name(&self) -> &'static str {
        "dummy"
    }

    async fn connect(&mut self) -> Result<(), CacheError> {
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), CacheError> {
        Ok(())
    }

    async fn get(&self, _key: &str) -> Result<Option<Value>, CacheError> {
        Ok(None)
    }

    async fn set(&self, _key: &str, value: &Value, _ttl: Option<u64>) -> Result<(), CacheError> {
        codec::encode(value)?;
        Ok(())
    }

    async fn add(&self, _key: &str, value: &Value, _ttl: Option<u64>) -> Result<bool, CacheError> {
        codec::encode(value)?;
        Ok(false)
    }

    async fn get_or_set(
        &self,
        _key: &str,
        fallback: Fallback<'_>,
        _ttl: Option<u64>,
    ) -> Result<Value, CacheError> {
        let value = fallback.resolve().await?;
        codec::encode(&value)?;
        Ok(value)
    }

    async fn get_many(&self, keys: &[String]) -> Result<HashMap<String, Option<Value>>, CacheError> {
        Ok(keys.iter().map(|key| (key.clone(), None)).collect())
    }

    async fn set_many(&self, entries: &[(String, Value)], _ttl: Option<u64>) -> Result<(), CacheError> {
        for (_, value) in entries {
            codec::encode(value)?;
        }
        Ok(())
    }

    async fn delete(&self, _key: &str) -> Result<(), CacheError> {
        Ok(())
    }

    async fn delete_many(&self, _keys: &[String]) -> Result<(), CacheError> {
        Ok(())
    }

    async fn clear(&self) -> Result<(), CacheError> {
        Ok(())
    }

    async fn touch(&self, _key: &str, _ttl: Option<u64>) -> Result<bool, CacheError> {
        Ok(false)
    }

    async fn incr(&self, key: &str, _delta: Delta) -> Result<Number, CacheError> {
        Err(CacheError::KeyNotSet(key.to_string()))
    }

    async fn decr(&self, key: &str, _delta: Delta) -> Result<Number, CacheError> {
        Err(CacheError::KeyNotSet(key.to_string()))
    }
}
