use crate::job::{Job, JobReport, Result};
use async_trait::async_trait;
use burrow_core::KeyPool;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use typed_builder::TypedBuilder;

#[derive(Debug, Clone, TypedBuilder)]
pub struct KeyGenerationConfig {
    /// Ids generated per run. Collisions with existing keys are skipped, so a
    /// run may insert fewer.
    #[builder(default = 100)]
    pub batch_size: usize,
    #[builder(default = Duration::from_secs(7 * 24 * 60 * 60))]
    pub period: Duration,
}

impl Default for KeyGenerationConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Tops up the key pool.
#[derive(Debug)]
pub struct KeyGenerationJob<P> {
    pool: Arc<P>,
    config: KeyGenerationConfig,
}

impl<P: KeyPool> KeyGenerationJob<P> {
    pub fn new(pool: Arc<P>, config: KeyGenerationConfig) -> Self {
        Self { pool, config }
    }
}

#[async_trait]
impl<P: KeyPool> Job for KeyGenerationJob<P> {
    fn name(&self) -> &str {
        "key-generation"
    }

    fn period(&self) -> Duration {
        self.config.period
    }

    async fn run(&self) -> Result<JobReport> {
        let inserted = self.pool.batch_create(self.config.batch_size).await?;
        let pool_size = self.pool.pool_size().await?;
        debug!(inserted, pool_size, "Key pool topped up");

        Ok(JobReport::new()
            .with("inserted", inserted)
            .with("pool_size", pool_size))
    }
}
