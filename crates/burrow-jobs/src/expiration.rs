use crate::job::{Job, JobReport, Result};
use async_trait::async_trait;
use burrow_core::{MembershipFilter, UrlCache, UrlStore};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use typed_builder::TypedBuilder;

#[derive(Debug, Clone, TypedBuilder)]
pub struct ExpirationConfig {
    /// Upper bound of records removed per run.
    #[builder(default = 1000)]
    pub batch_size: usize,
    #[builder(default = Duration::from_secs(24 * 60 * 60))]
    pub period: Duration,
}

impl Default for ExpirationConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Sweeps expired records out of the store, then evicts their ids from the
/// cache and the membership filter.
///
/// Only the store sweep can fail a run. Stale cache entries expire on their
/// own, and a stale filter entry only costs a store lookup.
#[derive(Debug)]
pub struct ExpirationJob<S, C, F> {
    store: Arc<S>,
    cache: Arc<C>,
    filter: Arc<F>,
    config: ExpirationConfig,
}

impl<S, C, F> ExpirationJob<S, C, F>
where
    S: UrlStore,
    C: UrlCache,
    F: MembershipFilter,
{
    pub fn new(store: Arc<S>, cache: Arc<C>, filter: Arc<F>, config: ExpirationConfig) -> Self {
        Self {
            store,
            cache,
            filter,
            config,
        }
    }
}

#[async_trait]
impl<S, C, F> Job for ExpirationJob<S, C, F>
where
    S: UrlStore,
    C: UrlCache,
    F: MembershipFilter,
{
    fn name(&self) -> &str {
        "expiration"
    }

    fn period(&self) -> Duration {
        self.config.period
    }

    async fn run(&self) -> Result<JobReport> {
        let expired = self.store.expire(self.config.batch_size).await?;
        let mut cache_failed = 0;
        let mut filter_failed = 0;

        if !expired.is_empty() {
            if let Err(e) = self.cache.del_many(&expired).await {
                warn!(count = expired.len(), error = %e, "Failed to evict expired ids from cache");
                cache_failed = 1;
            }

            match self.filter.del_many(&expired).await {
                Ok(true) => {}
                Ok(false) => debug!("Some expired ids were not in the membership filter"),
                Err(e) => {
                    warn!(
                        count = expired.len(),
                        error = %e,
                        "Failed to remove expired ids from filter"
                    );
                    filter_failed = 1;
                }
            }
        }

        Ok(JobReport::new()
            .with("expired", expired.len() as u64)
            .with("cache_cleanup_failed", cache_failed)
            .with("filter_cleanup_failed", filter_failed))
    }
}
