use async_trait::async_trait;
use burrow_core::cache::Result;
use burrow_core::{CacheError, CacheTtl, ShortId, UrlCache};
use redis::AsyncCommands;
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Default prefix of cache keys.
pub const DEFAULT_KEY_PREFIX: &str = "burrow:url:";

/// A Redis-based implementation of [`UrlCache`].
///
/// Values are the original URLs as plain strings, stored under
/// `<prefix><id>` with a jittered expiry.
#[derive(Debug, Clone)]
pub struct RedisUrlCache {
    conn: redis::aio::MultiplexedConnection,
    key_prefix: String,
    ttl: CacheTtl,
}

/// `PSETEX` rejects a zero expiry, so the shortest TTL sent is 1ms.
fn expiry_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

fn map_redis_error(operation: &str, err: redis::RedisError) -> CacheError {
    let message = format!("{operation}: {err}");
    if err.is_timeout() {
        CacheError::Timeout(message)
    } else if err.is_io_error() || err.is_connection_dropped() || err.is_connection_refusal() {
        CacheError::Unavailable(message)
    } else {
        CacheError::Operation(message)
    }
}

impl RedisUrlCache {
    pub fn new(conn: redis::aio::MultiplexedConnection, ttl: CacheTtl) -> Self {
        Self::with_prefix(conn, ttl, DEFAULT_KEY_PREFIX)
    }

    /// Creates a cache whose keys start with `key_prefix` instead of
    /// [`DEFAULT_KEY_PREFIX`].
    pub fn with_prefix(
        conn: redis::aio::MultiplexedConnection,
        ttl: CacheTtl,
        key_prefix: impl Into<String>,
    ) -> Self {
        Self {
            conn,
            key_prefix: key_prefix.into(),
            ttl,
        }
    }

    fn cache_key(&self, id: &ShortId) -> String {
        format!("{}{}", self.key_prefix, id.as_str())
    }
}

#[async_trait]
impl UrlCache for RedisUrlCache {
    async fn get(&self, id: &ShortId) -> Result<Option<String>> {
        let key = self.cache_key(id);
        trace!(id = %id, "Fetching URL from Redis cache");

        let mut conn = self.conn.clone();
        match conn.get::<_, Option<String>>(&key).await {
            Ok(Some(original)) => {
                debug!(id = %id, "Cache hit in Redis");
                Ok(Some(original))
            }
            Ok(None) => {
                trace!(id = %id, "Cache miss in Redis");
                Ok(None)
            }
            Err(e) => {
                warn!(id = %id, error = %e, "Redis error on get");
                Err(map_redis_error("failed to fetch value from Redis", e))
            }
        }
    }

    async fn set(&self, id: &ShortId, original: &str) -> Result<()> {
        let key = self.cache_key(id);
        let millis = expiry_millis(self.ttl.sample());
        trace!(id = %id, ttl_ms = millis, "Storing URL in Redis cache");

        let mut conn = self.conn.clone();
        conn.pset_ex::<_, _, ()>(&key, original, millis)
            .await
            .map_err(|e| {
                warn!(id = %id, error = %e, "Failed to cache URL in Redis");
                map_redis_error("failed to write value to Redis", e)
            })
    }

    async fn del(&self, id: &ShortId) -> Result<()> {
        let key = self.cache_key(id);
        trace!(id = %id, "Removing URL from Redis cache");

        let mut conn = self.conn.clone();
        conn.del::<_, ()>(&key).await.map_err(|e| {
            warn!(id = %id, error = %e, "Failed to remove URL from Redis cache");
            map_redis_error("failed to delete value from Redis", e)
        })
    }

    async fn del_many(&self, ids: &[ShortId]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let keys: Vec<String> = ids.iter().map(|id| self.cache_key(id)).collect();

        let mut conn = self.conn.clone();
        conn.del::<_, ()>(keys).await.map_err(|e| {
            warn!(count = ids.len(), error = %e, "Failed to remove URLs from Redis cache");
            map_redis_error("failed to delete values from Redis", e)
        })?;
        debug!(count = ids.len(), "Removed URLs from Redis cache");
        Ok(())
    }
}
