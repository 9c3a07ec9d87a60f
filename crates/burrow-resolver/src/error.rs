use burrow_core::{CacheError, LockError, StorageError};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ResolveError>;

/// Errors returned by [`ResolverService`](crate::ResolverService).
///
/// Only failures of the authoritative path surface here. Best-effort side
/// effects (cache writes, filter updates) are logged and swallowed.
#[derive(Debug, Clone, Error)]
pub enum ResolveError {
    #[error("short url not found: {0}")]
    NotFound(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("lock not acquired in time: {0}")]
    LockUnavailable(String),
    #[error("store operation timed out: {0}")]
    StoreTimeout(String),
    #[error(transparent)]
    Store(#[from] StorageError),
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error(transparent)]
    Lock(#[from] LockError),
}

/// Stable classification of a [`ResolveError`], independent of its message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    InvalidInput,
    StoreInternal,
    CacheInternal,
    LockInternal,
    LockUnavailable,
}

impl ErrorKind {
    /// Business code reported to clients.
    pub fn code(self) -> u32 {
        match self {
            ErrorKind::NotFound => 1001,
            ErrorKind::InvalidInput => 1002,
            ErrorKind::StoreInternal => 1100,
            ErrorKind::CacheInternal => 1200,
            ErrorKind::LockInternal => 1201,
            ErrorKind::LockUnavailable => 1300,
        }
    }

    pub fn http_status(self) -> u16 {
        match self {
            ErrorKind::NotFound => 404,
            ErrorKind::InvalidInput => 400,
            ErrorKind::StoreInternal | ErrorKind::CacheInternal | ErrorKind::LockInternal => 500,
            ErrorKind::LockUnavailable => 503,
        }
    }
}

impl ResolveError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ResolveError::NotFound(_) => ErrorKind::NotFound,
            ResolveError::InvalidInput(_) => ErrorKind::InvalidInput,
            ResolveError::LockUnavailable(_) => ErrorKind::LockUnavailable,
            ResolveError::StoreTimeout(_) => ErrorKind::StoreInternal,
            ResolveError::Store(e) if e.is_not_found() => ErrorKind::NotFound,
            ResolveError::Store(_) => ErrorKind::StoreInternal,
            ResolveError::Cache(_) => ErrorKind::CacheInternal,
            ResolveError::Lock(_) => ErrorKind::LockInternal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_absence_is_not_found() {
        let missing = ResolveError::from(StorageError::NotFound("ab12cd".into()));
        let exhausted = ResolveError::from(StorageError::PoolExhausted);
        assert_eq!(missing.kind(), ErrorKind::NotFound);
        assert_eq!(exhausted.kind(), ErrorKind::NotFound);
        assert_eq!(missing.kind().http_status(), 404);
    }

    #[test]
    fn backend_failures_are_internal() {
        let store = ResolveError::from(StorageError::Query("syntax".into()));
        let timeout = ResolveError::StoreTimeout("get".into());
        let cache = ResolveError::from(CacheError::Unavailable("down".into()));
        let lock = ResolveError::from(LockError::Unavailable("down".into()));

        assert_eq!(store.kind().code(), 1100);
        assert_eq!(timeout.kind().code(), 1100);
        assert_eq!(cache.kind().code(), 1200);
        assert_eq!(lock.kind().code(), 1201);
        for err in [store, timeout, cache, lock] {
            assert_eq!(err.kind().http_status(), 500);
        }
    }

    #[test]
    fn lock_contention_is_service_unavailable() {
        let err = ResolveError::LockUnavailable("lock:ab12cd".into());
        assert_eq!(err.kind(), ErrorKind::LockUnavailable);
        assert_eq!(err.kind().code(), 1300);
        assert_eq!(err.kind().http_status(), 503);
    }

    #[test]
    fn invalid_input_is_bad_request() {
        let err = ResolveError::InvalidInput("empty url".into());
        assert_eq!(err.kind().code(), 1002);
        assert_eq!(err.kind().http_status(), 400);
    }
}
