//! Key pool and URL store implementations.

pub mod memory;
pub mod postgres;

pub use burrow_core::store::{KeyPool, Result, UrlStore};
pub use burrow_core::StorageError;
pub use memory::InMemoryStore;
pub use postgres::PostgresStore;

use jiff::SignedDuration;
use std::time::Duration;

/// Default lifetime of a URL record.
pub const DEFAULT_RECORD_TTL: Duration = Duration::from_secs(60 * 60);

pub(crate) fn signed_ttl(ttl: Duration) -> SignedDuration {
    SignedDuration::try_from(ttl).unwrap_or(SignedDuration::MAX)
}
