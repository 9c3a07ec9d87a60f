use crate::{signed_ttl, Result, DEFAULT_RECORD_TTL};
use async_trait::async_trait;
use burrow_core::{
    KeyPool, ShortId, ShortIdGenerator, ShortKey, StorageError, UrlRecord, UrlStore,
};
use jiff::{SignedDuration, Timestamp};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, trace};

#[derive(Debug, Default)]
struct State {
    keys: HashMap<ShortId, Timestamp>,
    urls: HashMap<ShortId, UrlRecord>,
}

/// In-memory key pool and URL store.
///
/// Pool and records share one mutex, so taking a key and inserting the record
/// is a single critical section: concurrent creates can never receive the
/// same id.
#[derive(Debug)]
pub struct InMemoryStore {
    state: Mutex<State>,
    generator: ShortIdGenerator,
    record_ttl: SignedDuration,
}

impl InMemoryStore {
    /// Creates an empty store with 6-character base62 ids and a one hour
    /// record TTL.
    pub fn new() -> Self {
        Self::with_generator(ShortIdGenerator::default(), DEFAULT_RECORD_TTL)
    }

    pub fn with_generator(generator: ShortIdGenerator, record_ttl: Duration) -> Self {
        Self {
            state: Mutex::new(State::default()),
            generator,
            record_ttl: signed_ttl(record_ttl),
        }
    }

    /// Puts specific ids into the pool. Ids already pooled or in use are
    /// skipped. Returns how many were added.
    pub fn seed_keys<I>(&self, ids: I) -> u64
    where
        I: IntoIterator<Item = ShortId>,
    {
        let now = Timestamp::now();
        let mut state = self.state.lock();
        let mut inserted = 0;
        for id in ids {
            if state.urls.contains_key(&id) || state.keys.contains_key(&id) {
                continue;
            }
            state.keys.insert(id, now);
            inserted += 1;
        }
        inserted
    }

    /// Stores a record as-is, bypassing the pool. Useful to seed records
    /// with explicit timestamps.
    pub fn insert_record(&self, record: UrlRecord) {
        let mut state = self.state.lock();
        state.keys.remove(&record.id);
        state.urls.insert(record.id.clone(), record);
    }

    /// Snapshot of the keys waiting in the pool, oldest first.
    pub fn pooled_keys(&self) -> Vec<ShortKey> {
        let mut keys: Vec<ShortKey> = self
            .state
            .lock()
            .keys
            .iter()
            .map(|(id, created_at)| ShortKey {
                id: id.clone(),
                created_at: *created_at,
            })
            .collect();
        keys.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        keys
    }

    /// Number of records held, expired or not.
    pub fn record_count(&self) -> usize {
        self.state.lock().urls.len()
    }

    pub fn contains_record(&self, id: &ShortId) -> bool {
        self.state.lock().urls.contains_key(id)
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyPool for InMemoryStore {
    async fn batch_create(&self, n: usize) -> Result<u64> {
        let inserted = self.seed_keys(self.generator.generate_batch(n));
        debug!(requested = n, inserted, "Topped up in-memory key pool");
        Ok(inserted)
    }

    async fn pool_size(&self) -> Result<u64> {
        Ok(self.state.lock().keys.len() as u64)
    }
}

#[async_trait]
impl UrlStore for InMemoryStore {
    async fn create(&self, original: &str) -> Result<UrlRecord> {
        let now = Timestamp::now();
        let expired_at = now.checked_add(self.record_ttl).map_err(|e| {
            StorageError::InvalidData(format!("record ttl overflows timestamp: {e}"))
        })?;

        let mut state = self.state.lock();
        let id = state
            .keys
            .keys()
            .next()
            .cloned()
            .ok_or(StorageError::PoolExhausted)?;
        state.keys.remove(&id);

        let record = UrlRecord {
            id: id.clone(),
            original: original.to_string(),
            created_at: now,
            expired_at,
        };
        state.urls.insert(id, record.clone());
        trace!(id = %record.id, "Allocated id from in-memory pool");
        Ok(record)
    }

    async fn get(&self, id: &ShortId) -> Result<UrlRecord> {
        let now = Timestamp::now();
        let state = self.state.lock();
        match state.urls.get(id) {
            Some(record) if record.is_live_at(now) => Ok(record.clone()),
            _ => Err(StorageError::NotFound(id.to_string())),
        }
    }

    async fn delete(&self, id: &ShortId) -> Result<()> {
        match self.state.lock().urls.remove(id) {
            Some(_) => Ok(()),
            None => Err(StorageError::NotFound(id.to_string())),
        }
    }

    async fn expire(&self, limit: usize) -> Result<Vec<ShortId>> {
        let now = Timestamp::now();
        let mut state = self.state.lock();
        let expired: Vec<ShortId> = state
            .urls
            .values()
            .filter(|record| record.expired_at < now)
            .take(limit)
            .map(|record| record.id.clone())
            .collect();
        for id in &expired {
            state.urls.remove(id);
        }
        Ok(expired)
    }
}
