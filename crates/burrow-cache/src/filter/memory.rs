//! In-process cuckoo filter.
//!
//! Same `CF.*`-style semantics as [`RedisCuckooFilter`](super::RedisCuckooFilter)
//! without the round trip, for single-node deployments and tests. Unlike a
//! plain Bloom filter a cuckoo filter stores fingerprints, so ids can be
//! removed again once their record expires.

use async_trait::async_trait;
use burrow_core::filter::Result;
use burrow_core::{FilterConfig, FilterError, MembershipFilter, ShortId};
use cuckoofilter::CuckooFilter;
use parking_lot::RwLock;
use std::collections::hash_map::DefaultHasher;
use std::fmt;

/// False positive rate of a full table: two buckets of four 8-bit
/// fingerprints are compared per lookup, `8 / 256`.
const FULL_TABLE_FP_RATE: f64 = 8.0 / 256.0;

/// Load factor bounds. Inserts start failing near 95% occupancy, and below
/// 10% memory grows faster than the false positive rate drops.
const MAX_LOAD: f64 = 0.9;
const MIN_LOAD: f64 = 0.1;

/// Membership filter backed by the `cuckoofilter` crate.
///
/// The fingerprint width is fixed by the crate, so the configured false
/// positive rate is reached by keeping the table emptier: a table at load
/// `l` answers falsely with probability about `l * 8 / 256`.
pub struct InMemoryCuckooFilter {
    filter: RwLock<CuckooFilter<DefaultHasher>>,
    capacity: usize,
}

impl InMemoryCuckooFilter {
    /// # Errors
    ///
    /// Returns `FilterError::Initialization` if `expected_items` is zero or
    /// the rate is not strictly between 0 and 1.
    pub fn new(config: FilterConfig) -> Result<Self> {
        if config.expected_items == 0 {
            return Err(FilterError::Initialization(
                "expected_items must be greater than zero".to_string(),
            ));
        }
        let rate = config.false_positive_rate;
        if !(rate > 0.0 && rate < 1.0) {
            return Err(FilterError::Initialization(format!(
                "false_positive_rate must be in (0, 1), got {rate}"
            )));
        }

        let load = (rate / FULL_TABLE_FP_RATE).clamp(MIN_LOAD, MAX_LOAD);
        let capacity = (config.expected_items as f64 / load).ceil() as usize;

        Ok(Self {
            filter: RwLock::new(CuckooFilter::with_capacity(capacity)),
            capacity,
        })
    }

    /// Number of fingerprints the table was sized for.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.filter.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.filter.read().is_empty()
    }
}

impl fmt::Debug for InMemoryCuckooFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryCuckooFilter")
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .finish()
    }
}

#[async_trait]
impl MembershipFilter for InMemoryCuckooFilter {
    async fn add(&self, id: &ShortId) -> Result<()> {
        // On a full table the crate keeps this id but evicts another one.
        self.filter.write().add(id.as_str()).map_err(|e| {
            FilterError::Operation(format!(
                "insert into filter sized for {} ids failed: {e:?}",
                self.capacity
            ))
        })
    }

    async fn exists(&self, id: &ShortId) -> Result<bool> {
        Ok(self.filter.read().contains(id.as_str()))
    }

    async fn del(&self, id: &ShortId) -> Result<bool> {
        Ok(self.filter.write().delete(id.as_str()))
    }

    async fn del_many(&self, ids: &[ShortId]) -> Result<bool> {
        let mut filter = self.filter.write();
        Ok(ids
            .iter()
            .fold(true, |all, id| filter.delete(id.as_str()) && all))
    }
}
