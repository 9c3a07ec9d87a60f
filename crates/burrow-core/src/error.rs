use thiserror::Error;

/// Errors raised by the key pool and URL store.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("record not found: {0}")]
    NotFound(String),
    #[error("key pool is exhausted")]
    PoolExhausted,
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
    #[error("storage operation timed out: {0}")]
    Timeout(String),
    #[error("storage query failed: {0}")]
    Query(String),
    #[error("stored data is invalid: {0}")]
    InvalidData(String),
}

impl StorageError {
    /// Returns `true` when the error means "there is nothing there", as
    /// opposed to a failure of the backend itself.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound(_) | StorageError::PoolExhausted)
    }
}

#[derive(Debug, Clone, Error)]
pub enum CacheError {
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),
    #[error("cache operation timed out: {0}")]
    Timeout(String),
    #[error("cache operation failed: {0}")]
    Operation(String),
}

#[derive(Debug, Clone, Error)]
pub enum FilterError {
    #[error("filter backend unavailable: {0}")]
    Unavailable(String),
    #[error("filter operation failed: {0}")]
    Operation(String),
    #[error("filter initialization failed: {0}")]
    Initialization(String),
}

#[derive(Debug, Clone, Error)]
pub enum LockError {
    #[error("lock backend unavailable: {0}")]
    Unavailable(String),
    #[error("lock operation failed: {0}")]
    Operation(String),
}
