//! Redis cache implementation using bb8 connection pool.
//!
//! Every operation maps onto native Redis commands. Conditional and atomic
//! commands (`SET … NX`, `INCRBY`, `INCRBYFLOAT`) are used instead of
//! read-modify-write sequences so concurrent clients in other processes
//! cannot interleave with them.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use bb8::{Pool, PooledConnection};
use redis::Client;
use redis::aio::MultiplexedConnection;
use serde_json::{Number, Value};
use tracing::info;

use crate::cache::codec::{self, Delta};
use crate::cache::traits::Backend;
use crate::cache::CacheError;
use crate::config::{CacheUrl, PoolOptions};

type RedisPool = Pool<Client>;

/// `INCRBYFLOAT` replies `12` for `10 + 2.0`; the script stores integral
/// results as `12.0` so the value keeps decoding as a float. TTL is kept.
const INCR_FLOAT_SCRIPT: &str = r#"
local value = redis.call('INCRBYFLOAT', KEYS[1], ARGV[1])
if not string.find(value, '[.eEn]') then
    value = value .. '.0'
    redis.call('SET', KEYS[1], value, 'KEEPTTL')
end
return value
"#;

/// Redis-based cache with bb8 connection pool.
pub struct RedisBackend {
    url: String,
    pool_options: PoolOptions,
    pool: Option<RedisPool>,
}

impl RedisBackend {
    /// Backend for `url`. Cache-level query options are stripped before the
    /// URL is handed to the Redis client.
    pub fn new(url: &CacheUrl, pool_options: PoolOptions) -> Self {
        Self {
            url: url.without_options(),
            pool_options,
            pool: None,
        }
    }

    /// URL used to open connections.
    pub fn connection_url(&self) -> &str {
        &self.url
    }

    pub fn pool_options(&self) -> &PoolOptions {
        &self.pool_options
    }

    async fn get_conn(&self) -> Result<PooledConnection<'_, Client>, CacheError> {
        let pool = self.pool.as_ref().ok_or(CacheError::NotConnected)?;
        Ok(pool.get().await?)
    }
}

#[async_trait]
impl Backend for RedisBackend {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn connect(&mut self) -> Result<(), CacheError> {
        let client = Client::open(self.url.as_str())?;

        let mut builder = Pool::builder();
        if let Some(max_size) = self.pool_options.max_size {
            builder = builder.max_size(max_size);
        }
        if let Some(min_size) = self.pool_options.min_size {
            builder = builder.min_idle(Some(min_size));
        }
        if let Some(timeout) = self.pool_options.connection_timeout {
            builder = builder.connection_timeout(Duration::from_secs(timeout));
        }

        let pool = builder.build(client).await?;
        info!(
            min_size = ?self.pool_options.min_size,
            max_size = ?self.pool_options.max_size,
            "redis connection pool ready"
        );
        self.pool = Some(pool);
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), CacheError> {
        // Dropping the last handle closes the pooled connections
        self.pool.take();
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
        let mut conn = self.get_conn().await?;
        let conn_ref: &mut MultiplexedConnection = &mut conn;

        let value: Option<String> = redis::cmd("GET").arg(key).query_async(conn_ref).await?;
        value.as_deref().map(codec::decode).transpose()
    }

    async fn set(&self, key: &str, value: &Value, ttl: Option<u64>) -> Result<(), CacheError> {
        let encoded = codec::encode(value)?;
        let mut conn = self.get_conn().await?;
        let conn_ref: &mut MultiplexedConnection = &mut conn;

        match ttl {
            None => {
                let _: () = redis::cmd("SET")
                    .arg(key)
                    .arg(encoded)
                    .query_async(conn_ref)
                    .await?;
            }
            // Expires immediately: nothing may remain under the key
            Some(0) => {
                let _: () = redis::cmd("UNLINK").arg(key).query_async(conn_ref).await?;
            }
            Some(seconds) => {
                let _: () = redis::cmd("SETEX")
                    .arg(key)
                    .arg(seconds)
                    .arg(encoded)
                    .query_async(conn_ref)
                    .await?;
            }
        }
        Ok(())
    }

    async fn add(&self, key: &str, value: &Value, ttl: Option<u64>) -> Result<bool, CacheError> {
        let encoded = codec::encode(value)?;
        let mut conn = self.get_conn().await?;
        let conn_ref: &mut MultiplexedConnection = &mut conn;

        let reply: Option<String> = match ttl {
            None => {
                redis::cmd("SET")
                    .arg(key)
                    .arg(encoded)
                    .arg("NX")
                    .query_async(conn_ref)
                    .await?
            }
            // The write would expire at once; only report whether it would happen
            Some(0) => {
                let exists: bool = redis::cmd("EXISTS").arg(key).query_async(conn_ref).await?;
                return Ok(!exists);
            }
            Some(seconds) => {
                redis::cmd("SET")
                    .arg(key)
                    .arg(encoded)
                    .arg("EX")
                    .arg(seconds)
                    .arg("NX")
                    .query_async(conn_ref)
                    .await?
            }
        };
        Ok(reply.is_some())
    }

    async fn get_many(&self, keys: &[String]) -> Result<HashMap<String, Option<Value>>, CacheError> {
        if keys.is_empty() {
            return Ok(HashMap::new());
        }

        let mut conn = self.get_conn().await?;
        let conn_ref: &mut MultiplexedConnection = &mut conn;

        let mut command = redis::cmd("MGET");
        for key in keys {
            command.arg(key.as_str());
        }
        let values: Vec<Option<String>> = command.query_async(conn_ref).await?;

        keys.iter()
            .zip(values)
            .map(|(key, value)| {
                let value = value.as_deref().map(codec::decode).transpose()?;
                Ok::<_, CacheError>((key.clone(), value))
            })
            .collect()
    }

    async fn set_many(&self, entries: &[(String, Value)], ttl: Option<u64>) -> Result<(), CacheError> {
        if entries.is_empty() {
            return Ok(());
        }

        let encoded = entries
            .iter()
            .map(|(key, value)| Ok::<_, CacheError>((key.as_str(), codec::encode(value)?)))
            .collect::<Result<Vec<_>, CacheError>>()?;

        let mut conn = self.get_conn().await?;

        if ttl == Some(0) {
            let conn_ref: &mut MultiplexedConnection = &mut conn;
            let mut command = redis::cmd("UNLINK");
            for (key, _) in &encoded {
                command.arg(*key);
            }
            let _: () = command.query_async(conn_ref).await?;
            return Ok(());
        }

        let mut command = redis::cmd("MSET");
        for (key, value) in &encoded {
            command.arg(*key).arg(value.as_str());
        }
        {
            let conn_ref: &mut MultiplexedConnection = &mut conn;
            let _: () = command.query_async(conn_ref).await?;
        }

        // Values are already visible; expiries are attached one key at a time
        if let Some(seconds) = ttl {
            let base: MultiplexedConnection = (*conn).clone();
            let expirations = encoded.iter().map(|(key, _)| {
                let mut conn = base.clone();
                async move {
                    let _: bool = redis::cmd("EXPIRE")
                        .arg(*key)
                        .arg(seconds)
                        .query_async(&mut conn)
                        .await?;
                    Ok::<_, CacheError>(())
                }
            });
            futures::future::try_join_all(expirations).await?;
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.get_conn().await?;
        let conn_ref: &mut MultiplexedConnection = &mut conn;

        let _: () = redis::cmd("UNLINK").arg(key).query_async(conn_ref).await?;
        Ok(())
    }

    async fn delete_many(&self, keys: &[String]) -> Result<(), CacheError> {
        if keys.is_empty() {
            return Ok(());
        }

        let mut conn = self.get_conn().await?;
        let conn_ref: &mut MultiplexedConnection = &mut conn;

        let mut command = redis::cmd("UNLINK");
        for key in keys {
            command.arg(key.as_str());
        }
        let _: () = command.query_async(conn_ref).await?;
        Ok(())
    }

    async fn clear(&self) -> Result<(), CacheError> {
        let mut conn = self.get_conn().await?;
        let conn_ref: &mut MultiplexedConnection = &mut conn;

        // Only the database selected by the URL is flushed
        let _: () = redis::cmd("FLUSHDB").arg("ASYNC").query_async(conn_ref).await?;
        Ok(())
    }

    async fn touch(&self, key: &str, ttl: Option<u64>) -> Result<bool, CacheError> {
        let mut conn = self.get_conn().await?;
        let conn_ref: &mut MultiplexedConnection = &mut conn;

        match ttl {
            // PERSIST also answers 0 for keys without expiry, so ask EXISTS too
            None => {
                let (exists, _): (bool, bool) = redis::pipe()
                    .atomic()
                    .cmd("EXISTS")
                    .arg(key)
                    .cmd("PERSIST")
                    .arg(key)
                    .query_async(conn_ref)
                    .await?;
                Ok(exists)
            }
            Some(0) => {
                let removed: i64 = redis::cmd("UNLINK").arg(key).query_async(conn_ref).await?;
                Ok(removed > 0)
            }
            Some(seconds) => {
                let updated: bool = redis::cmd("EXPIRE")
                    .arg(key)
                    .arg(seconds)
                    .query_async(conn_ref)
                    .await?;
                Ok(updated)
            }
        }
    }

    async fn incr(&self, key: &str, delta: Delta) -> Result<Number, CacheError> {
        let mut conn = self.get_conn().await?;
        let conn_ref: &mut MultiplexedConnection = &mut conn;

        // INCRBY would create a missing key, which incr must refuse
        let exists: bool = redis::cmd("EXISTS").arg(key).query_async(&mut *conn_ref).await?;
        if !exists {
            return Err(CacheError::KeyNotSet(key.to_string()));
        }

        match delta {
            Delta::Int(delta) => {
                // Redis counters are signed 64-bit
                let delta = i64::try_from(delta).map_err(|_| CacheError::Overflow(key.to_string()))?;
                let value: i64 = redis::cmd("INCRBY")
                    .arg(key)
                    .arg(delta)
                    .query_async(conn_ref)
                    .await?;
                Ok(Number::from(value))
            }
            Delta::Float(delta) => {
                let value: String = redis::cmd("EVAL")
                    .arg(INCR_FLOAT_SCRIPT)
                    .arg(1)
                    .arg(key)
                    .arg(delta)
                    .query_async(conn_ref)
                    .await?;
                let value: f64 = value
                    .parse()
                    .map_err(|_| CacheError::NotANumber(key.to_string()))?;
                Number::from_f64(value).ok_or_else(|| CacheError::Overflow(key.to_string()))
            }
        }
    }
}
