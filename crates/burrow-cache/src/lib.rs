//! Cache and membership filter backends for Burrow.
//!
//! [`RedisUrlCache`] and [`RedisCuckooFilter`] are shared across instances;
//! [`MokaUrlCache`] and [`InMemoryCuckooFilter`] live in-process and suit
//! single-node deployments and tests.

pub mod filter;
pub mod moka;
pub mod redis;

pub use burrow_core::{CacheError, CacheTtl, FilterConfig, FilterError, MembershipFilter, UrlCache};
pub use filter::{InMemoryCuckooFilter, RedisCuckooFilter};
pub use self::moka::MokaUrlCache;
pub use self::redis::RedisUrlCache;
