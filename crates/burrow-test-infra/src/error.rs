use thiserror::Error;

/// Failure to bring up a disposable backend for an integration test.
#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("container failed to start: {0}")]
    Container(#[from] testcontainers::TestcontainersError),

    #[error("redis fixture: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("postgres still refusing connections after {attempts} attempts: {source}")]
    PostgresNotReady {
        attempts: u32,
        #[source]
        source: sqlx::Error,
    },
}

pub type Result<T> = std::result::Result<T, FixtureError>;
