use crate::error::CacheError;
use crate::id::ShortId;
use async_trait::async_trait;
use std::time::Duration;
use typed_builder::TypedBuilder;

pub type Result<T> = std::result::Result<T, CacheError>;

/// Lifetime of a cache entry: a fixed base plus a uniformly random jitter.
///
/// Entries written together (e.g. after a cold start) would otherwise all
/// expire in the same instant and send a burst of reads to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TypedBuilder)]
pub struct CacheTtl {
    #[builder(default = Duration::from_secs(30 * 60))]
    pub base: Duration,
    /// Upper bound of the random extension added to `base`.
    #[builder(default = Duration::from_secs(60))]
    pub jitter: Duration,
}

impl CacheTtl {
    /// Draws a TTL in `[base, base + jitter]`, at millisecond granularity.
    pub fn sample(&self) -> Duration {
        let bound = u64::try_from(self.jitter.as_millis()).unwrap_or(u64::MAX);
        if bound == 0 {
            return self.base;
        }
        self.base + Duration::from_millis(rand::random_range(0..=bound))
    }
}

impl Default for CacheTtl {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Cache of id -> original URL.
///
/// The cache is optional by contract: a missing entry is always valid, and
/// callers fall back to the store.
#[async_trait]
pub trait UrlCache: Send + Sync + 'static {
    /// Returns `Ok(None)` when the key does not exist. Transport failures are
    /// reported as `Err`, so callers can tell a miss from an outage.
    async fn get(&self, id: &ShortId) -> Result<Option<String>>;

    /// Stores the URL with a freshly sampled [`CacheTtl`].
    async fn set(&self, id: &ShortId, original: &str) -> Result<()>;

    /// Removes one entry. Removing a missing key is not an error.
    async fn del(&self, id: &ShortId) -> Result<()>;

    /// Removes many entries at once.
    async fn del_many(&self, ids: &[ShortId]) -> Result<()>;
}
