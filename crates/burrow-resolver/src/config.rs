use std::time::Duration;
use typed_builder::TypedBuilder;

/// Tuning of [`ResolverService`](crate::ResolverService).
///
/// A cold read makes up to three store or cache calls under the lock. Keep
/// `lock_duration` above three `operation_timeout`s; calls under the lock are
/// cut off when it expires regardless.
#[derive(Debug, Clone, TypedBuilder)]
pub struct ResolverConfig {
    /// Prepended to an id to name its repopulation lock.
    #[builder(default = "lock:".to_string(), setter(into))]
    pub lock_prefix: String,
    /// How long a repopulation lock is held before it expires on its own.
    #[builder(default = Duration::from_secs(3))]
    pub lock_duration: Duration,
    /// How long a resolve waits for the lock before giving up.
    #[builder(default = Duration::from_secs(2))]
    pub lock_wait: Duration,
    /// Deadline applied to each store, cache and filter call.
    #[builder(default = Duration::from_millis(800))]
    pub operation_timeout: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}
