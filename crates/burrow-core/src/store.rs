use crate::error::StorageError;
use crate::id::ShortId;
use crate::record::UrlRecord;
use async_trait::async_trait;

pub type Result<T> = std::result::Result<T, StorageError>;

/// Durable pool of pre-generated, unused ids.
#[async_trait]
pub trait KeyPool: Send + Sync + 'static {
    /// Generates `n` random ids and inserts them, skipping ids that already
    /// exist. Returns how many rows were actually inserted.
    async fn batch_create(&self, n: usize) -> Result<u64>;

    /// Number of keys still available for allocation.
    async fn pool_size(&self) -> Result<u64>;
}

/// Durable id -> original URL records.
#[async_trait]
pub trait UrlStore: Send + Sync + 'static {
    /// Consumes one key from the pool and turns it into a record expiring
    /// after the store's record TTL. The draw and the insert happen in one
    /// transaction; two concurrent calls never receive the same id.
    ///
    /// Returns `Err(PoolExhausted)` when no key is available.
    async fn create(&self, original: &str) -> Result<UrlRecord>;

    /// Returns the record if it exists and has not expired, otherwise
    /// `Err(NotFound)`.
    async fn get(&self, id: &ShortId) -> Result<UrlRecord>;

    /// Removes the record. `Err(NotFound)` if there was nothing to remove.
    async fn delete(&self, id: &ShortId) -> Result<()>;

    /// Removes up to `limit` expired records and returns their ids.
    async fn expire(&self, limit: usize) -> Result<Vec<ShortId>>;
}
