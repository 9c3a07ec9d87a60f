use crate::wait::wait_schedule;
use async_trait::async_trait;
use burrow_core::lock::Result;
use burrow_core::{LockToken, Locker};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{trace, warn};

#[derive(Debug)]
struct Holder {
    token: String,
    deadline: Instant,
}

/// Process-local [`Locker`] with the same TTL and token semantics as
/// [`RedisLocker`](crate::RedisLocker).
#[derive(Debug, Default)]
pub struct InMemoryLocker {
    holders: DashMap<String, Holder>,
}

impl InMemoryLocker {
    pub fn new() -> Self {
        Self::default()
    }

    fn try_acquire(&self, token: &LockToken, lock_duration: Duration) -> bool {
        let now = Instant::now();
        let holder = Holder {
            token: token.token().to_string(),
            deadline: now + lock_duration,
        };

        match self.holders.entry(token.name().to_string()) {
            Entry::Occupied(mut entry) if entry.get().deadline <= now => {
                entry.insert(holder);
                true
            }
            Entry::Occupied(_) => false,
            Entry::Vacant(entry) => {
                entry.insert(holder);
                true
            }
        }
    }

    /// Returns `true` while `name` is held by anyone.
    pub fn is_locked(&self, name: &str) -> bool {
        self.holders
            .get(name)
            .is_some_and(|holder| holder.deadline > Instant::now())
    }
}

#[async_trait]
impl Locker for InMemoryLocker {
    async fn acquire(
        &self,
        name: &str,
        lock_duration: Duration,
        wait_time: Duration,
    ) -> Result<Option<LockToken>> {
        let token = LockToken::generate(name);

        for step in wait_schedule(wait_time) {
            if self.try_acquire(&token, lock_duration) {
                trace!(lock = %name, "Acquired lock");
                return Ok(Some(token));
            }
            if !step.is_zero() {
                tokio::time::sleep(step).await;
            }
        }
        Ok(None)
    }

    async fn release(&self, token: &LockToken) -> Result<bool> {
        let now = Instant::now();
        let removed = self
            .holders
            .remove_if(token.name(), |_, holder| holder.token == token.token());

        let released = removed.is_some_and(|(_, holder)| holder.deadline > now);
        if !released {
            warn!(lock = %token, "Lock expired or was taken over before release");
        }
        Ok(released)
    }
}
