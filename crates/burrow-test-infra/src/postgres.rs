use crate::{FixtureError, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;
use testcontainers::core::{IntoContainerPort, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::ImageExt;
use testcontainers::{ContainerAsync, GenericImage};

const CREDENTIAL: &str = "burrow";
const CONNECT_ATTEMPTS: u32 = 20;
const CONNECT_BACKOFF: Duration = Duration::from_millis(500);

/// A throwaway `postgres:16-alpine` server. Database, user and password are
/// all `burrow`.
pub struct PostgresServer {
    container: ContainerAsync<GenericImage>,
    url: String,
}

impl PostgresServer {
    pub async fn start() -> Result<Self> {
        let container = GenericImage::new("postgres", "16-alpine")
            .with_exposed_port(5432_u16.tcp())
            .with_wait_for(WaitFor::message_on_stderr(
                "database system is ready to accept connections",
            ))
            .with_env_var("POSTGRES_DB", CREDENTIAL)
            .with_env_var("POSTGRES_USER", CREDENTIAL)
            .with_env_var("POSTGRES_PASSWORD", CREDENTIAL)
            .start()
            .await?;

        let host = container.get_host().await?;
        let port = container.get_host_port_ipv4(5432).await?;
        let url = format!("postgres://{CREDENTIAL}:{CREDENTIAL}@{host}:{port}/{CREDENTIAL}");

        Ok(Self { container, url })
    }

    pub fn database_url(&self) -> &str {
        &self.url
    }

    /// Opens a pool, retrying while the server finishes its init restart.
    /// The ready banner is printed once before that restart, so the first
    /// connections can still be refused.
    pub async fn pool(&self) -> Result<PgPool> {
        let mut attempt = 1;
        loop {
            match PgPoolOptions::new().max_connections(8).connect(&self.url).await {
                Ok(pool) => return Ok(pool),
                Err(source) if attempt >= CONNECT_ATTEMPTS => {
                    return Err(FixtureError::PostgresNotReady {
                        attempts: attempt,
                        source,
                    });
                }
                Err(_) => {
                    attempt += 1;
                    tokio::time::sleep(CONNECT_BACKOFF).await;
                }
            }
        }
    }

    pub fn container(&self) -> &ContainerAsync<GenericImage> {
        &self.container
    }
}
