use async_trait::async_trait;
use burrow_core::cache::Result;
use burrow_core::{CacheTtl, ShortId, UrlCache};
use moka::future::Cache;
use moka::Expiry;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

#[derive(Debug, Clone)]
struct Entry {
    original: String,
    ttl: Duration,
}

/// Expires every entry after the TTL sampled when it was written.
struct SampledTtl;

impl Expiry<ShortId, Entry> for SampledTtl {
    fn expire_after_create(
        &self,
        _key: &ShortId,
        value: &Entry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &ShortId,
        value: &Entry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// An in-memory [`UrlCache`] backed by Moka.
///
/// Each entry carries its own jittered TTL, the same way the Redis cache
/// sets `PX` per key.
#[derive(Debug, Clone)]
pub struct MokaUrlCache {
    cache: Cache<ShortId, Entry>,
    ttl: CacheTtl,
}

impl MokaUrlCache {
    /// Creates a cache holding at most 10,000 entries with the default TTL.
    pub fn new() -> Self {
        Self::with_capacity(10_000, CacheTtl::default())
    }

    pub fn with_capacity(max_capacity: u64, ttl: CacheTtl) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .expire_after(SampledTtl)
            .build();
        Self { cache, ttl }
    }
}

impl Default for MokaUrlCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UrlCache for MokaUrlCache {
    async fn get(&self, id: &ShortId) -> Result<Option<String>> {
        match self.cache.get(id).await {
            Some(entry) => {
                debug!(id = %id, "Cache hit in Moka");
                Ok(Some(entry.original))
            }
            None => {
                trace!(id = %id, "Cache miss in Moka");
                Ok(None)
            }
        }
    }

    async fn set(&self, id: &ShortId, original: &str) -> Result<()> {
        let entry = Entry {
            original: original.to_string(),
            ttl: self.ttl.sample(),
        };
        self.cache.insert(id.clone(), entry).await;
        Ok(())
    }

    async fn del(&self, id: &ShortId) -> Result<()> {
        self.cache.invalidate(id).await;
        Ok(())
    }

    async fn del_many(&self, ids: &[ShortId]) -> Result<()> {
        for id in ids {
            self.cache.invalidate(id).await;
        }
        debug!(count = ids.len(), "Removed URLs from Moka cache");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> ShortId {
        ShortId::new_unchecked(s)
    }

    #[tokio::test]
    async fn set_then_get() {
        let cache = MokaUrlCache::new();
        cache.set(&id("abc123"), "https://example.com").await.unwrap();

        assert_eq!(
            cache.get(&id("abc123")).await.unwrap().as_deref(),
            Some("https://example.com")
        );
        assert_eq!(cache.get(&id("zzz999")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn del_and_del_many_remove_entries() {
        let cache = MokaUrlCache::new();
        for s in ["a1", "b2", "c3"] {
            cache.set(&id(s), "https://example.com").await.unwrap();
        }

        cache.del(&id("a1")).await.unwrap();
        cache.del(&id("missing")).await.unwrap();
        cache.del_many(&[id("b2"), id("c3")]).await.unwrap();
        cache.del_many(&[]).await.unwrap();

        for s in ["a1", "b2", "c3"] {
            assert_eq!(cache.get(&id(s)).await.unwrap(), None);
        }
    }

    #[tokio::test]
    async fn entries_expire_after_their_ttl() {
        let ttl = CacheTtl::builder()
            .base(Duration::from_millis(50))
            .jitter(Duration::from_millis(20))
            .build();
        let cache = MokaUrlCache::with_capacity(100, ttl);
        cache.set(&id("short"), "https://example.com").await.unwrap();
        assert!(cache.get(&id("short")).await.unwrap().is_some());

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(cache.get(&id("short")).await.unwrap(), None);
    }
}
