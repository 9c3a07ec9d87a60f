//! Resolution and allocation engine for Burrow.
//!
//! [`ResolverService`] composes a store, a cache, a membership filter and a
//! lock into the create / resolve / delete flows.

pub mod config;
pub mod error;
pub mod service;

pub use config::ResolverConfig;
pub use error::{ErrorKind, ResolveError, Result};
pub use service::ResolverService;
