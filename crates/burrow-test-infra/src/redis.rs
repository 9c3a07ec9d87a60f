use crate::Result;
use redis::aio::MultiplexedConnection;
use testcontainers::core::{IntoContainerPort, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, GenericImage};

/// A throwaway Redis Stack server. Plain Redis lacks the RedisBloom module
/// behind the `CF.*` commands.
pub struct RedisStack {
    container: ContainerAsync<GenericImage>,
    url: String,
}

impl RedisStack {
    pub async fn start() -> Result<Self> {
        let container = GenericImage::new("redis/redis-stack-server", "7.4.0-v3")
            .with_exposed_port(6379_u16.tcp())
            .with_wait_for(WaitFor::message_on_stdout("Ready to accept connections"))
            .start()
            .await?;

        // "localhost" may resolve to ::1, which the port mapping does not cover.
        let host = match container.get_host().await?.to_string().as_str() {
            "localhost" => "127.0.0.1".to_string(),
            other => other.to_string(),
        };
        let port = container.get_host_port_ipv4(6379).await?;

        Ok(Self {
            container,
            url: format!("redis://{host}:{port}"),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn connection(&self) -> Result<MultiplexedConnection> {
        let client = redis::Client::open(self.url.as_str())?;
        Ok(client.get_multiplexed_async_connection().await?)
    }

    pub fn container(&self) -> &ContainerAsync<GenericImage> {
        &self.container
    }
}
