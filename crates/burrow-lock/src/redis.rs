use crate::wait::wait_schedule;
use async_trait::async_trait;
use burrow_core::lock::Result;
use burrow_core::{LockError, LockToken, Locker};
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Deletes the key only if it still holds the caller's token.
const RELEASE_SCRIPT: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("DEL", KEYS[1])
else
    return 0
end
"#;

/// Redis-backed [`Locker`].
///
/// A lock is a key set with `SET NX PX` whose value is the holder's token.
#[derive(Debug, Clone)]
pub struct RedisLocker {
    conn: redis::aio::MultiplexedConnection,
    release_script: redis::Script,
}

fn map_redis_error(operation: &str, err: redis::RedisError) -> LockError {
    let message = format!("{operation}: {err}");
    if err.is_io_error()
        || err.is_timeout()
        || err.is_connection_dropped()
        || err.is_connection_refusal()
    {
        LockError::Unavailable(message)
    } else {
        LockError::Operation(message)
    }
}

impl RedisLocker {
    pub fn new(conn: redis::aio::MultiplexedConnection) -> Self {
        Self {
            conn,
            release_script: redis::Script::new(RELEASE_SCRIPT),
        }
    }

    async fn try_acquire(&self, token: &LockToken, lock_duration: Duration) -> Result<bool> {
        let millis = u64::try_from(lock_duration.as_millis())
            .unwrap_or(u64::MAX)
            .max(1);

        let mut conn = self.conn.clone();
        let reply: Option<String> = redis::cmd("SET")
            .arg(token.name())
            .arg(token.token())
            .arg("NX")
            .arg("PX")
            .arg(millis)
            .query_async(&mut conn)
            .await
            .map_err(|e| map_redis_error("failed to set lock key", e))?;
        Ok(reply.is_some())
    }
}

#[async_trait]
impl Locker for RedisLocker {
    async fn acquire(
        &self,
        name: &str,
        lock_duration: Duration,
        wait_time: Duration,
    ) -> Result<Option<LockToken>> {
        let token = LockToken::generate(name);

        for step in wait_schedule(wait_time) {
            if self.try_acquire(&token, lock_duration).await? {
                trace!(lock = %name, "Acquired lock");
                return Ok(Some(token));
            }
            if !step.is_zero() {
                tokio::time::sleep(step).await;
            }
        }

        debug!(
            lock = %name,
            wait_ms = wait_time.as_millis() as u64,
            "Gave up waiting for lock"
        );
        Ok(None)
    }

    async fn release(&self, token: &LockToken) -> Result<bool> {
        let mut conn = self.conn.clone();
        let deleted: i64 = self
            .release_script
            .key(token.name())
            .arg(token.token())
            .invoke_async(&mut conn)
            .await
            .map_err(|e| map_redis_error("failed to release lock", e))?;

        if deleted == 0 {
            warn!(lock = %token, "Lock expired or was taken over before release");
        }
        Ok(deleted == 1)
    }
}
