use crate::{signed_ttl, Result, DEFAULT_RECORD_TTL};
use async_trait::async_trait;
use burrow_core::{KeyPool, ShortId, ShortIdGenerator, StorageError, UrlRecord, UrlStore};
use jiff::{SignedDuration, Timestamp};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Keys inserted per statement by [`KeyPool::batch_create`].
const INSERT_CHUNK: usize = 10_000;

const SCHEMA: &str = include_str!("../ddl/postgres/schema.sql");

/// PostgreSQL implementation of the key pool and URL store.
///
/// Allocation relies on `FOR UPDATE SKIP LOCKED`: concurrent creates each
/// lock a different pool row instead of queueing behind the same one.
/// Timestamps are stored as Unix milliseconds.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
    generator: ShortIdGenerator,
    record_ttl: SignedDuration,
}

impl PostgresStore {
    /// Creates a store from an existing pool, with 6-character base62 ids
    /// and a one hour record TTL.
    pub fn new(pool: PgPool) -> Self {
        Self::with_generator(pool, ShortIdGenerator::default(), DEFAULT_RECORD_TTL)
    }

    pub fn with_generator(pool: PgPool, generator: ShortIdGenerator, record_ttl: Duration) -> Self {
        Self {
            pool,
            generator,
            record_ttl: signed_ttl(record_ttl),
        }
    }

    /// Creates a store by opening a new connection pool.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(map_sqlx_error)?;
        Ok(Self::new(pool))
    }

    /// Creates the `keys` and `urls` tables if they do not exist yet.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    /// Returns a reference to the underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Moves one pooled key into `urls` inside a transaction.
    ///
    /// Returns `Ok(None)` when the key picked is already used by a live
    /// record. That key is dropped from the pool so no later create can pick
    /// it again.
    async fn try_allocate(
        &self,
        original: &str,
        now: Timestamp,
        expired_at: Timestamp,
    ) -> Result<Option<String>> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        let id: Option<String> = sqlx::query_scalar(
            r#"
            SELECT id
            FROM keys
            LIMIT 1
            FOR UPDATE SKIP LOCKED
            "#,
        )
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        // Dropping the transaction rolls it back.
        let Some(id) = id else {
            return Err(StorageError::PoolExhausted);
        };

        let inserted = sqlx::query(
            r#"
            INSERT INTO urls (id, original, created_at, expired_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(&id)
        .bind(original)
        .bind(now.as_millisecond())
        .bind(expired_at.as_millisecond())
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?
        .rows_affected();

        sqlx::query("DELETE FROM keys WHERE id = $1")
            .bind(&id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;

        if inserted == 0 {
            warn!(id = %id, "Discarded pooled key already used by a record");
            return Ok(None);
        }
        Ok(Some(id))
    }
}

fn to_timestamp(millis: i64) -> Result<Timestamp> {
    Timestamp::from_millisecond(millis).map_err(|e| {
        StorageError::InvalidData(format!("invalid timestamp '{millis}': {e}"))
    })
}

fn decode_record(row: &PgRow) -> Result<UrlRecord> {
    let id: String = row.try_get("id").map_err(map_sqlx_error)?;
    let original: String = row.try_get("original").map_err(map_sqlx_error)?;
    let created_at: i64 = row.try_get("created_at").map_err(map_sqlx_error)?;
    let expired_at: i64 = row.try_get("expired_at").map_err(map_sqlx_error)?;

    Ok(UrlRecord {
        id: ShortId::new_unchecked(id),
        original,
        created_at: to_timestamp(created_at)?,
        expired_at: to_timestamp(expired_at)?,
    })
}

fn map_sqlx_error(err: sqlx::Error) -> StorageError {
    let message = err.to_string();

    match err {
        sqlx::Error::PoolTimedOut => StorageError::Timeout(message),
        sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => StorageError::Unavailable(message),
        sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::TypeNotFound { .. }
        | sqlx::Error::Decode(_) => StorageError::InvalidData(message),
        sqlx::Error::RowNotFound => StorageError::NotFound(message),
        _ => StorageError::Query(message),
    }
}

#[async_trait]
impl KeyPool for PostgresStore {
    async fn batch_create(&self, n: usize) -> Result<u64> {
        let now = Timestamp::now().as_millisecond();
        let ids = self.generator.generate_batch(n);
        let mut inserted = 0;

        for chunk in ids.chunks(INSERT_CHUNK) {
            let chunk_ids: Vec<String> = chunk.iter().map(|id| id.as_str().to_owned()).collect();
            let created: Vec<i64> = vec![now; chunk_ids.len()];

            let result = sqlx::query(
                r#"
                INSERT INTO keys (id, created_at)
                SELECT t.id, t.created_at
                FROM UNNEST($1::text[], $2::bigint[]) AS t(id, created_at)
                WHERE NOT EXISTS (SELECT 1 FROM urls u WHERE u.id = t.id)
                ON CONFLICT (id) DO NOTHING
                "#,
            )
            .bind(chunk_ids)
            .bind(created)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

            inserted += result.rows_affected();
        }

        debug!(requested = n, inserted, "Topped up key pool");
        Ok(inserted)
    }

    async fn pool_size(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM keys")
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(u64::try_from(count).unwrap_or_default())
    }
}

#[async_trait]
impl UrlStore for PostgresStore {
    async fn create(&self, original: &str) -> Result<UrlRecord> {
        let now = Timestamp::now();
        let expired_at = now.checked_add(self.record_ttl).map_err(|e| {
            StorageError::InvalidData(format!("record ttl overflows timestamp: {e}"))
        })?;

        // Each pass either allocates or discards one pooled key, so the loop
        // ends at the latest when the pool runs dry.
        loop {
            if let Some(id) = self.try_allocate(original, now, expired_at).await? {
                trace!(id = %id, "Allocated id from key pool");
                return Ok(UrlRecord {
                    id: ShortId::new_unchecked(id),
                    original: original.to_string(),
                    created_at: to_timestamp(now.as_millisecond())?,
                    expired_at: to_timestamp(expired_at.as_millisecond())?,
                });
            }
        }
    }

    async fn get(&self, id: &ShortId) -> Result<UrlRecord> {
        let now = Timestamp::now().as_millisecond();

        let row = sqlx::query(
            r#"
            SELECT id, original, created_at, expired_at
            FROM urls
            WHERE id = $1
              AND expired_at > $2
            "#,
        )
        .bind(id.as_str())
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        match row {
            Some(row) => decode_record(&row),
            None => Err(StorageError::NotFound(id.to_string())),
        }
    }

    async fn delete(&self, id: &ShortId) -> Result<()> {
        let result = sqlx::query("DELETE FROM urls WHERE id = $1")
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn expire(&self, limit: usize) -> Result<Vec<ShortId>> {
        let now = Timestamp::now().as_millisecond();
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let ids: Vec<String> = sqlx::query_scalar(
            r#"
            DELETE FROM urls
            WHERE id IN (
                SELECT id
                FROM urls
                WHERE expired_at < $1
                LIMIT $2
                FOR UPDATE SKIP LOCKED
            )
            RETURNING id
            "#,
        )
        .bind(now)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        debug!(expired = ids.len(), "Swept expired records");
        Ok(ids.into_iter().map(ShortId::new_unchecked).collect())
    }
}
