use clap::{Parser, ValueEnum};
use std::fmt::{Display, Formatter};

pub const DATABASE_URL_ENV: &str = "BURROW_DATABASE_URL";
pub const REDIS_URL_ENV: &str = "BURROW_REDIS_URL";
pub const KEY_BATCH_SIZE_ENV: &str = "BURROW_KEY_BATCH_SIZE";
pub const KEY_INTERVAL_ENV: &str = "BURROW_KEY_INTERVAL";
pub const EXPIRE_BATCH_SIZE_ENV: &str = "BURROW_EXPIRE_BATCH_SIZE";
pub const EXPIRE_INTERVAL_ENV: &str = "BURROW_EXPIRE_INTERVAL";
pub const ID_LENGTH_ENV: &str = "BURROW_ID_LENGTH";
pub const RECORD_TTL_ENV: &str = "BURROW_RECORD_TTL";
pub const FILTER_KEY_ENV: &str = "BURROW_FILTER_KEY";
pub const CACHE_PREFIX_ENV: &str = "BURROW_CACHE_PREFIX";
pub const LOG_FORMAT_ENV: &str = "BURROW_LOG_FORMAT";
pub const ONCE_ENV: &str = "BURROW_ONCE";

pub const DEFAULT_KEY_INTERVAL_SECS: u64 = 7 * 24 * 60 * 60;
pub const DEFAULT_EXPIRE_INTERVAL_SECS: u64 = 24 * 60 * 60;
pub const DEFAULT_RECORD_TTL_SECS: u64 = 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[value(name = "pretty")]
    Pretty,
    #[value(name = "json")]
    Json,
}

impl Display for LogFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            LogFormat::Pretty => write!(f, "pretty"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

/// Durations are whole seconds.
#[derive(Debug, Parser)]
#[command(name = "burrow-cron")]
pub struct CLI {
    #[arg(long, env = DATABASE_URL_ENV)]
    pub database_url: String,

    #[arg(long, env = REDIS_URL_ENV)]
    pub redis_url: String,

    #[arg(long, env = KEY_BATCH_SIZE_ENV, default_value_t = 100)]
    pub key_batch_size: usize,

    #[arg(
        long,
        env = KEY_INTERVAL_ENV,
        default_value_t = DEFAULT_KEY_INTERVAL_SECS,
        value_parser = clap::value_parser!(u64).range(1..),
    )]
    pub key_interval: u64,

    #[arg(long, env = EXPIRE_BATCH_SIZE_ENV, default_value_t = 1000)]
    pub expire_batch_size: usize,

    #[arg(
        long,
        env = EXPIRE_INTERVAL_ENV,
        default_value_t = DEFAULT_EXPIRE_INTERVAL_SECS,
        value_parser = clap::value_parser!(u64).range(1..),
    )]
    pub expire_interval: u64,

    #[arg(long, env = ID_LENGTH_ENV, default_value_t = 6)]
    pub id_length: usize,

    #[arg(long, env = RECORD_TTL_ENV, default_value_t = DEFAULT_RECORD_TTL_SECS)]
    pub record_ttl: u64,

    #[arg(long, env = FILTER_KEY_ENV, default_value = burrow_cache::filter::cuckoo::DEFAULT_FILTER_KEY)]
    pub filter_key: String,

    #[arg(long, env = CACHE_PREFIX_ENV, default_value = burrow_cache::redis::DEFAULT_KEY_PREFIX)]
    pub cache_prefix: String,

    #[arg(long, env = LOG_FORMAT_ENV, value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,

    /// Run every job a single time and exit.
    #[arg(long, env = ONCE_ENV)]
    pub once: bool,
}
