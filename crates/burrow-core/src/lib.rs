//! Core types and traits for the Burrow URL shortener.
//!
//! This crate defines the data model shared by every component, the error
//! taxonomy of each layer, and the traits the resolution engine is composed
//! from: [`KeyPool`], [`UrlStore`], [`UrlCache`], [`MembershipFilter`] and
//! [`Locker`].

pub mod cache;
pub mod error;
pub mod filter;
pub mod id;
pub mod lock;
pub mod record;
pub mod store;

pub use cache::{CacheTtl, UrlCache};
pub use error::{CacheError, FilterError, LockError, StorageError};
pub use filter::{FilterConfig, MembershipFilter};
pub use id::{ShortId, ShortIdConfig, ShortIdGenerator, BASE62_ALPHABET};
pub use lock::{LockToken, Locker};
pub use record::{ShortKey, UrlRecord, MAX_ORIGINAL_URL_LEN};
pub use store::{KeyPool, UrlStore};
