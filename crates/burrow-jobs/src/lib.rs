//! Recurring maintenance for Burrow: topping up the key pool and sweeping
//! expired records out of the store, cache and filter.

pub mod expiration;
pub mod job;
pub mod key_generation;
pub mod scheduler;

pub use expiration::{ExpirationConfig, ExpirationJob};
pub use job::{Job, JobError, JobReport, Result};
pub use key_generation::{KeyGenerationConfig, KeyGenerationJob};
pub use scheduler::{Scheduler, SchedulerHandle};
