//! Named locks with bounded-wait acquisition.
//!
//! Acquisition retries along [`wait_schedule`]; holders release with the
//! [`LockToken`] they were given, so an expired holder cannot free a lock
//! someone else has since taken.

pub mod memory;
pub mod redis;
pub mod wait;

pub use burrow_core::{LockError, LockToken, Locker};
pub use memory::InMemoryLocker;
pub use self::redis::RedisLocker;
pub use wait::{wait_schedule, WAIT_STEP_CEILING, WAIT_STEP_FLOOR, WAIT_STEP_GROWTH};
