mod cli;

use crate::cli::{LogFormat, CLI};
use anyhow::Context;
use burrow_cache::{CacheTtl, RedisCuckooFilter, RedisUrlCache};
use burrow_core::{ShortIdConfig, ShortIdGenerator};
use burrow_jobs::{
    ExpirationConfig, ExpirationJob, KeyGenerationConfig, KeyGenerationJob, Scheduler,
};
use burrow_storage::PostgresStore;
use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CLI::try_parse()?;
    init_tracing(config.log_format);

    info!(
        key_batch_size = config.key_batch_size,
        key_interval_secs = config.key_interval,
        expire_batch_size = config.expire_batch_size,
        expire_interval_secs = config.expire_interval,
        once = config.once,
        "starting burrow cron"
    );

    let id_config = ShortIdConfig::builder().length(config.id_length).build();
    let generator = ShortIdGenerator::new(&id_config).map_err(anyhow::Error::msg)?;

    let pool = PgPoolOptions::new()
        .connect(&config.database_url)
        .await
        .context("failed to connect to postgres")?;
    let store = PostgresStore::with_generator(
        pool,
        generator,
        Duration::from_secs(config.record_ttl),
    );
    store.migrate().await.context("failed to apply schema")?;
    let store = Arc::new(store);

    let client = redis::Client::open(config.redis_url.as_str())?;
    let conn = client
        .get_multiplexed_async_connection()
        .await
        .context("failed to connect to redis")?;
    let cache = RedisUrlCache::with_prefix(conn.clone(), CacheTtl::default(), config.cache_prefix);
    let filter = RedisCuckooFilter::with_key(conn, config.filter_key);

    let mut scheduler = Scheduler::new();
    scheduler
        .register(KeyGenerationJob::new(
            Arc::clone(&store),
            KeyGenerationConfig::builder()
                .batch_size(config.key_batch_size)
                .period(Duration::from_secs(config.key_interval))
                .build(),
        ))
        .register(ExpirationJob::new(
            store,
            Arc::new(cache),
            Arc::new(filter),
            ExpirationConfig::builder()
                .batch_size(config.expire_batch_size)
                .period(Duration::from_secs(config.expire_interval))
                .build(),
        ));

    if config.once {
        let failed: Vec<String> = scheduler
            .run_once()
            .await
            .into_iter()
            .filter(|(_, outcome)| outcome.is_err())
            .map(|(name, _)| name)
            .collect();
        if !failed.is_empty() {
            anyhow::bail!("jobs failed: {}", failed.join(", "));
        }
        return Ok(());
    }

    let handle = scheduler.start();
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;

    info!("shutting down burrow cron");
    handle.shutdown().await;
    Ok(())
}
