use async_trait::async_trait;
use burrow_core::filter::Result;
use burrow_core::{FilterError, MembershipFilter, ShortId};
use tracing::{debug, trace, warn};

/// Default key of the cuckoo filter in Redis.
pub const DEFAULT_FILTER_KEY: &str = "burrow:ids";

/// Membership filter backed by a RedisBloom cuckoo filter.
///
/// Cuckoo filters support deletion, so ids removed by the expiration job stop
/// passing `exists`. Requires the RedisBloom module (bundled in Redis Stack).
#[derive(Debug, Clone)]
pub struct RedisCuckooFilter {
    conn: redis::aio::MultiplexedConnection,
    key: String,
}

fn map_redis_error(operation: &str, err: redis::RedisError) -> FilterError {
    let message = format!("{operation}: {err}");
    if err.is_io_error()
        || err.is_timeout()
        || err.is_connection_dropped()
        || err.is_connection_refusal()
    {
        FilterError::Unavailable(message)
    } else {
        FilterError::Operation(message)
    }
}

impl RedisCuckooFilter {
    pub fn new(conn: redis::aio::MultiplexedConnection) -> Self {
        Self::with_key(conn, DEFAULT_FILTER_KEY)
    }

    pub fn with_key(conn: redis::aio::MultiplexedConnection, key: impl Into<String>) -> Self {
        Self {
            conn,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

#[async_trait]
impl MembershipFilter for RedisCuckooFilter {
    async fn add(&self, id: &ShortId) -> Result<()> {
        let mut conn = self.conn.clone();
        redis::cmd("CF.ADD")
            .arg(&self.key)
            .arg(id.as_str())
            .query_async::<i64>(&mut conn)
            .await
            .map_err(|e| {
                warn!(id = %id, error = %e, "Failed to add id to cuckoo filter");
                map_redis_error("CF.ADD failed", e)
            })?;
        trace!(id = %id, "Added id to cuckoo filter");
        Ok(())
    }

    async fn exists(&self, id: &ShortId) -> Result<bool> {
        let mut conn = self.conn.clone();
        let found = redis::cmd("CF.EXISTS")
            .arg(&self.key)
            .arg(id.as_str())
            .query_async::<i64>(&mut conn)
            .await
            .map_err(|e| map_redis_error("CF.EXISTS failed", e))?;
        Ok(found == 1)
    }

    async fn del(&self, id: &ShortId) -> Result<bool> {
        let mut conn = self.conn.clone();
        let deleted = redis::cmd("CF.DEL")
            .arg(&self.key)
            .arg(id.as_str())
            .query_async::<i64>(&mut conn)
            .await
            .map_err(|e| map_redis_error("CF.DEL failed", e))?;
        Ok(deleted == 1)
    }

    async fn del_many(&self, ids: &[ShortId]) -> Result<bool> {
        if ids.is_empty() {
            return Ok(true);
        }

        let mut pipe = redis::pipe();
        for id in ids {
            pipe.cmd("CF.DEL").arg(&self.key).arg(id.as_str());
        }

        let mut conn = self.conn.clone();
        let results: Vec<i64> = pipe
            .query_async(&mut conn)
            .await
            .map_err(|e| map_redis_error("pipelined CF.DEL failed", e))?;

        let missing = results.iter().filter(|deleted| **deleted != 1).count();
        if missing > 0 {
            debug!(
                count = ids.len(),
                missing, "Some ids were not present in the cuckoo filter"
            );
        }
        Ok(missing == 0)
    }
}
