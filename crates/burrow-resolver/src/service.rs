use crate::config::ResolverConfig;
use crate::error::{ResolveError, Result};
use burrow_core::{
    CacheError, FilterError, KeyPool, LockToken, Locker, MembershipFilter, ShortId, StorageError,
    UrlCache, UrlRecord, UrlStore, MAX_ORIGINAL_URL_LEN,
};
use std::future::Future;
use std::sync::Arc;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, trace, warn};

/// Orchestrates the store, cache, filter and lock.
///
/// Reads go filter -> cache -> lock -> cache -> store, so a cold entry is
/// loaded from the store by a single caller while concurrent callers for the
/// same id wait on the lock and then find it in the cache.
pub struct ResolverService<S, C, F, L> {
    store: Arc<S>,
    cache: Arc<C>,
    filter: Arc<F>,
    locker: Arc<L>,
    config: ResolverConfig,
}

impl<S, C, F, L> Clone for ResolverService<S, C, F, L> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            cache: Arc::clone(&self.cache),
            filter: Arc::clone(&self.filter),
            locker: Arc::clone(&self.locker),
            config: self.config.clone(),
        }
    }
}

impl<S, C, F, L> ResolverService<S, C, F, L>
where
    S: UrlStore + KeyPool,
    C: UrlCache,
    F: MembershipFilter,
    L: Locker,
{
    /// Components are shared, so the same store and cache can also back the
    /// background jobs.
    pub fn new(
        store: Arc<S>,
        cache: Arc<C>,
        filter: Arc<F>,
        locker: Arc<L>,
        config: ResolverConfig,
    ) -> Self {
        Self {
            store,
            cache,
            filter,
            locker,
            config,
        }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Allocates an id from the key pool for `original`.
    ///
    /// The store is authoritative. Populating the cache and the filter is
    /// best effort: failures are logged and the record is still returned.
    pub async fn create(&self, original: &str) -> Result<UrlRecord> {
        validate_original(original)?;

        let record = self
            .with_store_deadline("create", self.deadline(), self.store.create(original))
            .await?;
        debug!(id = %record.id, "Created short url");

        if let Err(e) = self
            .with_cache_deadline(
                "set",
                self.deadline(),
                self.cache.set(&record.id, &record.original),
            )
            .await
        {
            warn!(id = %record.id, error = %e, "Failed to cache new record");
        }

        if let Err(e) = self
            .with_filter_deadline("add", self.filter.add(&record.id))
            .await
        {
            // Reads for this id are rejected until the filter learns it.
            warn!(id = %record.id, error = %e, "Failed to add id to membership filter");
        }

        Ok(record)
    }

    /// Resolves `id` to its original URL.
    ///
    /// # Errors
    ///
    /// - `NotFound` kind when the filter rules the id out, or the store has
    ///   no live record for it.
    /// - `LockUnavailable` when another caller held the repopulation lock
    ///   for the whole wait.
    /// - `CacheInternal` when the first cache probe fails.
    pub async fn get(&self, id: &ShortId) -> Result<String> {
        trace!(id = %id, "Resolving id");

        match self.with_filter_deadline("exists", self.filter.exists(id)).await {
            Ok(true) => {}
            Ok(false) => {
                debug!(id = %id, "Membership filter rejected id");
                return Err(ResolveError::NotFound(id.to_string()));
            }
            Err(e) => {
                warn!(id = %id, error = %e, "Membership filter unavailable, continuing");
            }
        }

        if let Some(original) = self
            .with_cache_deadline("get", self.deadline(), self.cache.get(id))
            .await?
        {
            debug!(id = %id, "Cache hit");
            return Ok(original);
        }

        let lock_name = format!("{}{}", self.config.lock_prefix, id);
        let token = self
            .locker
            .acquire(&lock_name, self.config.lock_duration, self.config.lock_wait)
            .await?;
        let Some(token) = token else {
            warn!(id = %id, lock = %lock_name, "Timed out waiting for repopulation lock");
            return Err(ResolveError::LockUnavailable(lock_name));
        };
        let lock_expiry = Instant::now() + self.config.lock_duration;
        let guard = LockGuard::new(Arc::clone(&self.locker), token);

        let resolved = self.load_locked(id, lock_expiry).await;
        guard.release().await;
        resolved
    }

    /// Second cache probe and store read, with the id's lock held.
    ///
    /// No call outlives `lock_expiry`: past it another caller may hold the
    /// lock and read the store too.
    async fn load_locked(&self, id: &ShortId, lock_expiry: Instant) -> Result<String> {
        let deadline = || self.deadline().min(lock_expiry);

        match self
            .with_cache_deadline("get", deadline(), self.cache.get(id))
            .await
        {
            Ok(Some(original)) => {
                debug!(id = %id, "Cache filled while waiting for lock");
                return Ok(original);
            }
            Ok(None) => trace!(id = %id, "Cache still cold, reading store"),
            Err(e) => warn!(id = %id, error = %e, "Cache re-probe failed, reading store"),
        }

        let record = self
            .with_store_deadline("get", deadline(), self.store.get(id))
            .await?;

        if let Err(e) = self
            .with_cache_deadline("set", deadline(), self.cache.set(id, &record.original))
            .await
        {
            warn!(id = %id, error = %e, "Failed to write back resolved record");
        }

        Ok(record.original)
    }

    /// Deletes `id`. Only the store deletion can fail the call.
    pub async fn delete(&self, id: &ShortId) -> Result<()> {
        if let Err(e) = self
            .with_cache_deadline("del", self.deadline(), self.cache.del(id))
            .await
        {
            warn!(id = %id, error = %e, "Failed to evict deleted id from cache");
        }

        self.with_store_deadline("delete", self.deadline(), self.store.delete(id))
            .await?;
        debug!(id = %id, "Deleted short url");

        match self.with_filter_deadline("del", self.filter.del(id)).await {
            Ok(true) => {}
            Ok(false) => warn!(id = %id, "Deleted id was not in membership filter"),
            Err(e) => warn!(id = %id, error = %e, "Failed to remove id from membership filter"),
        }

        Ok(())
    }

    /// Tops up the key pool with up to `n` fresh ids.
    pub async fn batch_create_keys(&self, n: usize) -> Result<u64> {
        self.with_store_deadline("batch_create", self.deadline(), self.store.batch_create(n))
            .await
    }

    fn deadline(&self) -> Instant {
        Instant::now() + self.config.operation_timeout
    }

    async fn with_store_deadline<T>(
        &self,
        operation: &str,
        deadline: Instant,
        call: impl Future<Output = std::result::Result<T, StorageError>>,
    ) -> Result<T> {
        match timeout_at(deadline, call).await {
            Ok(result) => result.map_err(ResolveError::from),
            Err(_) => Err(ResolveError::StoreTimeout(format!(
                "store {operation} missed its deadline"
            ))),
        }
    }

    async fn with_cache_deadline<T>(
        &self,
        operation: &str,
        deadline: Instant,
        call: impl Future<Output = std::result::Result<T, CacheError>>,
    ) -> std::result::Result<T, CacheError> {
        timeout_at(deadline, call).await.unwrap_or_else(|_| {
            Err(CacheError::Timeout(format!(
                "cache {operation} missed its deadline"
            )))
        })
    }

    /// A filter that does not answer in time counts as unavailable, so
    /// `exists` fails open.
    async fn with_filter_deadline<T>(
        &self,
        operation: &str,
        call: impl Future<Output = std::result::Result<T, FilterError>>,
    ) -> std::result::Result<T, FilterError> {
        timeout_at(self.deadline(), call).await.unwrap_or_else(|_| {
            Err(FilterError::Unavailable(format!(
                "filter {operation} exceeded {:?}",
                self.config.operation_timeout
            )))
        })
    }
}

/// Owns an acquired repopulation lock.
///
/// [`LockGuard::release`] frees it in line. If the resolving future is
/// dropped first, the guard hands the release to a spawned task so the id is
/// not blocked until the lock expires.
struct LockGuard<L: Locker> {
    locker: Arc<L>,
    token: Option<LockToken>,
}

impl<L: Locker> LockGuard<L> {
    fn new(locker: Arc<L>, token: LockToken) -> Self {
        Self {
            locker,
            token: Some(token),
        }
    }

    async fn release(mut self) {
        if let Some(token) = self.token.take() {
            release_lock(self.locker.as_ref(), &token).await;
        }
    }
}

impl<L: Locker> Drop for LockGuard<L> {
    fn drop(&mut self) {
        let Some(token) = self.token.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let locker = Arc::clone(&self.locker);
                debug!(lock = %token, "Resolve cancelled, releasing lock in background");
                handle.spawn(async move { release_lock(locker.as_ref(), &token).await });
            }
            Err(_) => warn!(lock = %token, "No runtime to release abandoned lock"),
        }
    }
}

async fn release_lock<L: Locker>(locker: &L, token: &LockToken) {
    match locker.release(token).await {
        Ok(true) => trace!(lock = %token, "Released repopulation lock"),
        Ok(false) => warn!(lock = %token, "Repopulation lock expired before release"),
        Err(e) => warn!(lock = %token, error = %e, "Failed to release repopulation lock"),
    }
}

fn validate_original(original: &str) -> Result<()> {
    if original.is_empty() {
        return Err(ResolveError::InvalidInput(
            "original url cannot be empty".to_string(),
        ));
    }
    if original.len() > MAX_ORIGINAL_URL_LEN {
        return Err(ResolveError::InvalidInput(format!(
            "original url is {} bytes, limit is {MAX_ORIGINAL_URL_LEN}",
            original.len()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use async_trait::async_trait;
    use burrow_core::{FilterError, LockError, LockToken};
    use burrow_lock::InMemoryLocker;
    use burrow_storage::InMemoryStore;
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Mutex;

    /// Store wrapper that counts reads and can be slowed down.
    #[derive(Default)]
    struct CountingStore {
        inner: InMemoryStore,
        gets: AtomicUsize,
        get_delay: Option<Duration>,
    }

    #[async_trait]
    impl UrlStore for CountingStore {
        async fn create(&self, original: &str) -> burrow_core::store::Result<UrlRecord> {
            self.inner.create(original).await
        }

        async fn get(&self, id: &ShortId) -> burrow_core::store::Result<UrlRecord> {
            self.gets.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.get_delay {
                tokio::time::sleep(delay).await;
            }
            self.inner.get(id).await
        }

        async fn delete(&self, id: &ShortId) -> burrow_core::store::Result<()> {
            self.inner.delete(id).await
        }

        async fn expire(&self, limit: usize) -> burrow_core::store::Result<Vec<ShortId>> {
            self.inner.expire(limit).await
        }
    }

    #[async_trait]
    impl KeyPool for CountingStore {
        async fn batch_create(&self, n: usize) -> burrow_core::store::Result<u64> {
            self.inner.batch_create(n).await
        }

        async fn pool_size(&self) -> burrow_core::store::Result<u64> {
            self.inner.pool_size().await
        }
    }

    #[derive(Default)]
    struct TestCache {
        items: Mutex<HashMap<ShortId, String>>,
        gets: AtomicUsize,
        broken: AtomicBool,
    }

    impl TestCache {
        fn check(&self) -> burrow_core::cache::Result<()> {
            if self.broken.load(Ordering::SeqCst) {
                return Err(CacheError::Unavailable("connection refused".into()));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl UrlCache for TestCache {
        async fn get(&self, id: &ShortId) -> burrow_core::cache::Result<Option<String>> {
            self.gets.fetch_add(1, Ordering::SeqCst);
            self.check()?;
            Ok(self.items.lock().await.get(id).cloned())
        }

        async fn set(&self, id: &ShortId, original: &str) -> burrow_core::cache::Result<()> {
            self.check()?;
            self.items.lock().await.insert(id.clone(), original.to_string());
            Ok(())
        }

        async fn del(&self, id: &ShortId) -> burrow_core::cache::Result<()> {
            self.check()?;
            self.items.lock().await.remove(id);
            Ok(())
        }

        async fn del_many(&self, ids: &[ShortId]) -> burrow_core::cache::Result<()> {
            self.check()?;
            let mut items = self.items.lock().await;
            for id in ids {
                items.remove(id);
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct TestFilter {
        ids: Mutex<HashSet<ShortId>>,
        broken: AtomicBool,
        stalled: AtomicBool,
    }

    impl TestFilter {
        async fn check(&self) -> burrow_core::filter::Result<()> {
            if self.stalled.load(Ordering::SeqCst) {
                tokio::time::sleep(Duration::from_secs(60)).await;
            }
            if self.broken.load(Ordering::SeqCst) {
                return Err(FilterError::Unavailable("connection refused".into()));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl MembershipFilter for TestFilter {
        async fn add(&self, id: &ShortId) -> burrow_core::filter::Result<()> {
            self.check().await?;
            self.ids.lock().await.insert(id.clone());
            Ok(())
        }

        async fn exists(&self, id: &ShortId) -> burrow_core::filter::Result<bool> {
            self.check().await?;
            Ok(self.ids.lock().await.contains(id))
        }

        async fn del(&self, id: &ShortId) -> burrow_core::filter::Result<bool> {
            self.check().await?;
            Ok(self.ids.lock().await.remove(id))
        }

        async fn del_many(&self, ids: &[ShortId]) -> burrow_core::filter::Result<bool> {
            self.check().await?;
            let mut set = self.ids.lock().await;
            Ok(ids.iter().fold(true, |all, id| set.remove(id) && all))
        }
    }

    struct BrokenLocker;

    #[async_trait]
    impl Locker for BrokenLocker {
        async fn acquire(
            &self,
            _name: &str,
            _lock_duration: Duration,
            _wait_time: Duration,
        ) -> burrow_core::lock::Result<Option<LockToken>> {
            Err(LockError::Unavailable("connection refused".into()))
        }

        async fn release(&self, _token: &LockToken) -> burrow_core::lock::Result<bool> {
            Ok(false)
        }
    }

    type TestService = ResolverService<CountingStore, TestCache, TestFilter, InMemoryLocker>;

    struct Harness {
        store: Arc<CountingStore>,
        cache: Arc<TestCache>,
        filter: Arc<TestFilter>,
        locker: Arc<InMemoryLocker>,
        service: TestService,
    }

    fn harness_with(store: CountingStore, config: ResolverConfig) -> Harness {
        let store = Arc::new(store);
        let cache = Arc::new(TestCache::default());
        let filter = Arc::new(TestFilter::default());
        let locker = Arc::new(InMemoryLocker::new());
        let service = ResolverService::new(
            Arc::clone(&store),
            Arc::clone(&cache),
            Arc::clone(&filter),
            Arc::clone(&locker),
            config,
        );
        Harness {
            store,
            cache,
            filter,
            locker,
            service,
        }
    }

    fn harness() -> Harness {
        harness_with(CountingStore::default(), ResolverConfig::default())
    }

    fn id(s: &str) -> ShortId {
        ShortId::new_unchecked(s)
    }

    #[tokio::test]
    async fn create_get_delete_round_trip() {
        let h = harness();
        h.store.inner.seed_keys([id("ab12cd")]);

        let created = h.service.create("http://x.com").await.unwrap();
        assert_eq!(created.id, id("ab12cd"));
        assert_eq!(h.service.get(&created.id).await.unwrap(), "http://x.com");

        h.service.delete(&created.id).await.unwrap();
        let err = h.service.get(&created.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn create_populates_cache_and_filter() {
        let h = harness();
        h.service.batch_create_keys(5).await.unwrap();

        let created = h.service.create("https://example.com").await.unwrap();

        assert!(h.filter.ids.lock().await.contains(&created.id));
        assert_eq!(
            h.cache.items.lock().await.get(&created.id).map(String::as_str),
            Some("https://example.com")
        );
    }

    #[tokio::test]
    async fn create_rejects_invalid_input() {
        let h = harness();
        h.service.batch_create_keys(5).await.unwrap();

        let empty = h.service.create("").await.unwrap_err();
        let long = h
            .service
            .create(&"a".repeat(MAX_ORIGINAL_URL_LEN + 1))
            .await
            .unwrap_err();

        assert_eq!(empty.kind(), ErrorKind::InvalidInput);
        assert_eq!(long.kind(), ErrorKind::InvalidInput);
        assert_eq!(h.store.inner.pool_size().await.unwrap(), 5);
    }

    #[tokio::test]
    async fn create_on_empty_pool_is_not_found() {
        let h = harness();
        let err = h.service.create("http://x.com").await.unwrap_err();
        assert!(matches!(err, ResolveError::Store(StorageError::PoolExhausted)));
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn create_survives_cache_and_filter_outage() {
        let h = harness();
        h.service.batch_create_keys(5).await.unwrap();
        h.cache.broken.store(true, Ordering::SeqCst);
        h.filter.broken.store(true, Ordering::SeqCst);

        let created = h.service.create("http://x.com").await.unwrap();
        assert!(h.store.inner.contains_record(&created.id));
    }

    #[tokio::test]
    async fn filter_rejection_skips_cache_and_store() {
        let h = harness();

        let err = h.service.get(&id("nope42")).await.unwrap_err();

        assert!(matches!(err, ResolveError::NotFound(_)));
        assert_eq!(h.cache.gets.load(Ordering::SeqCst), 0);
        assert_eq!(h.store.gets.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn filter_outage_fails_open() {
        let h = harness();
        h.store.inner.seed_keys([id("ab12cd")]);
        h.service.create("http://x.com").await.unwrap();
        h.cache.items.lock().await.clear();
        h.filter.broken.store(true, Ordering::SeqCst);

        assert_eq!(h.service.get(&id("ab12cd")).await.unwrap(), "http://x.com");
        assert_eq!(h.store.gets.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cache_hit_skips_lock_and_store() {
        let h = harness();
        h.filter.ids.lock().await.insert(id("ab12cd"));
        h.cache
            .items
            .lock()
            .await
            .insert(id("ab12cd"), "http://cached.com".into());
        // Holding the lock proves the hit path never waits on it.
        let _held = h
            .locker
            .acquire("lock:ab12cd", Duration::from_secs(5), Duration::ZERO)
            .await
            .unwrap();

        assert_eq!(h.service.get(&id("ab12cd")).await.unwrap(), "http://cached.com");
        assert_eq!(h.store.gets.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn cold_read_writes_back_and_releases_lock() {
        let h = harness();
        h.store.inner.seed_keys([id("ab12cd")]);
        h.service.create("http://x.com").await.unwrap();
        h.cache.items.lock().await.clear();

        assert_eq!(h.service.get(&id("ab12cd")).await.unwrap(), "http://x.com");
        assert_eq!(h.service.get(&id("ab12cd")).await.unwrap(), "http://x.com");

        assert_eq!(h.store.gets.load(Ordering::SeqCst), 1);
        assert!(!h.locker.is_locked("lock:ab12cd"));
    }

    #[tokio::test]
    async fn concurrent_cold_reads_hit_store_once() {
        let store = CountingStore {
            get_delay: Some(Duration::from_millis(50)),
            ..CountingStore::default()
        };
        let h = harness_with(store, ResolverConfig::default());
        h.store.inner.seed_keys([id("ab12cd")]);
        h.service.create("http://x.com").await.unwrap();
        h.cache.items.lock().await.clear();

        let mut handles = vec![];
        for _ in 0..16 {
            let service = h.service.clone();
            handles.push(tokio::spawn(async move { service.get(&id("ab12cd")).await }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), "http://x.com");
        }
        assert_eq!(h.store.gets.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn contended_lock_is_unavailable() {
        let config = ResolverConfig::builder()
            .lock_wait(Duration::from_millis(100))
            .build();
        let h = harness_with(CountingStore::default(), config);
        h.filter.ids.lock().await.insert(id("ab12cd"));
        let _held = h
            .locker
            .acquire("lock:ab12cd", Duration::from_secs(5), Duration::ZERO)
            .await
            .unwrap();

        let err = h.service.get(&id("ab12cd")).await.unwrap_err();

        assert!(matches!(err, ResolveError::LockUnavailable(_)));
        assert_eq!(err.kind().http_status(), 503);
        assert_eq!(h.store.gets.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn lock_transport_error_propagates() {
        let store = Arc::new(CountingStore::default());
        let filter = Arc::new(TestFilter::default());
        filter.ids.lock().await.insert(id("ab12cd"));
        let service = ResolverService::new(
            Arc::clone(&store),
            Arc::new(TestCache::default()),
            filter,
            Arc::new(BrokenLocker),
            ResolverConfig::default(),
        );

        let err = service.get(&id("ab12cd")).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::LockInternal);
        assert_eq!(store.gets.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn first_cache_probe_failure_propagates() {
        let h = harness();
        h.filter.ids.lock().await.insert(id("ab12cd"));
        h.cache.broken.store(true, Ordering::SeqCst);

        let err = h.service.get(&id("ab12cd")).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::CacheInternal);
        assert_eq!(h.store.gets.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn slow_store_times_out() {
        let store = CountingStore {
            get_delay: Some(Duration::from_millis(500)),
            ..CountingStore::default()
        };
        let config = ResolverConfig::builder()
            .operation_timeout(Duration::from_millis(50))
            .build();
        let h = harness_with(store, config);
        h.filter.ids.lock().await.insert(id("ab12cd"));

        let err = h.service.get(&id("ab12cd")).await.unwrap_err();

        assert!(matches!(err, ResolveError::StoreTimeout(_)));
        assert_eq!(err.kind(), ErrorKind::StoreInternal);
        assert!(!h.locker.is_locked("lock:ab12cd"));
    }

    #[tokio::test(start_paused = true)]
    async fn lock_expiry_cuts_off_store_read() {
        let store = CountingStore {
            get_delay: Some(Duration::from_millis(500)),
            ..CountingStore::default()
        };
        let config = ResolverConfig::builder()
            .lock_duration(Duration::from_millis(100))
            .operation_timeout(Duration::from_secs(1))
            .build();
        let h = harness_with(store, config);
        h.filter.ids.lock().await.insert(id("ab12cd"));

        let err = h.service.get(&id("ab12cd")).await.unwrap_err();

        assert!(matches!(err, ResolveError::StoreTimeout(_)));
        assert_eq!(h.store.gets.load(Ordering::SeqCst), 1);
        assert!(!h.locker.is_locked("lock:ab12cd"));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_resolve_releases_lock() {
        let store = CountingStore {
            get_delay: Some(Duration::from_millis(500)),
            ..CountingStore::default()
        };
        let config = ResolverConfig::builder()
            .lock_duration(Duration::from_secs(5))
            .operation_timeout(Duration::from_secs(1))
            .build();
        let h = harness_with(store, config);
        h.store.inner.seed_keys([id("ab12cd")]);
        h.service.create("http://x.com").await.unwrap();
        h.cache.items.lock().await.clear();

        let service = h.service.clone();
        let pending = tokio::spawn(async move { service.get(&id("ab12cd")).await });
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(h.locker.is_locked("lock:ab12cd"));

        pending.abort();
        assert!(pending.await.unwrap_err().is_cancelled());
        // Let the spawned release run.
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert!(!h.locker.is_locked("lock:ab12cd"));

        assert_eq!(h.service.get(&id("ab12cd")).await.unwrap(), "http://x.com");
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_filter_fails_open() {
        let h = harness();
        h.store.inner.seed_keys([id("ab12cd")]);
        h.service.create("http://x.com").await.unwrap();
        h.cache.items.lock().await.clear();
        h.filter.stalled.store(true, Ordering::SeqCst);

        assert_eq!(h.service.get(&id("ab12cd")).await.unwrap(), "http://x.com");
        h.service.delete(&id("ab12cd")).await.unwrap();
        assert!(!h.store.inner.contains_record(&id("ab12cd")));
    }

    #[tokio::test]
    async fn delete_survives_cache_and_filter_outage() {
        let h = harness();
        h.store.inner.seed_keys([id("ab12cd")]);
        h.service.create("http://x.com").await.unwrap();
        h.cache.broken.store(true, Ordering::SeqCst);
        h.filter.broken.store(true, Ordering::SeqCst);

        h.service.delete(&id("ab12cd")).await.unwrap();
        assert!(!h.store.inner.contains_record(&id("ab12cd")));
    }

    #[tokio::test]
    async fn delete_of_unknown_id_is_not_found() {
        let h = harness();
        let err = h.service.delete(&id("nope42")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn batch_create_keys_fills_pool() {
        let h = harness();
        let inserted = h.service.batch_create_keys(100).await.unwrap();
        assert_eq!(h.store.inner.pool_size().await.unwrap(), inserted);
        assert!(inserted > 90);
    }
}
