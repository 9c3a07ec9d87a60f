use crate::error::LockError;
use async_trait::async_trait;
use std::fmt::Display;
use std::time::Duration;

pub type Result<T> = std::result::Result<T, LockError>;

/// Proof of a successful acquisition.
///
/// The token is stored as the lock's value, so a release can only remove the
/// lock it was issued for, never a later holder's.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockToken {
    name: String,
    token: String,
}

impl LockToken {
    pub fn new(name: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            token: token.into(),
        }
    }

    /// Builds a token with a random 128-bit hex value.
    pub fn generate(name: impl Into<String>) -> Self {
        Self::new(name, format!("{:032x}", rand::random::<u128>()))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

impl Display for LockToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

/// Named mutual exclusion with a TTL and bounded-wait acquisition.
#[async_trait]
pub trait Locker: Send + Sync + 'static {
    /// Tries to take `name` for `lock_duration`, retrying for roughly
    /// `wait_time`.
    ///
    /// Returns `Ok(None)` if the lock stayed taken for the whole wait.
    async fn acquire(
        &self,
        name: &str,
        lock_duration: Duration,
        wait_time: Duration,
    ) -> Result<Option<LockToken>>;

    /// Releases the lock if it is still held by `token`.
    ///
    /// Returns `false` when the lock had already expired or was taken over.
    async fn release(&self, token: &LockToken) -> Result<bool>;
}
