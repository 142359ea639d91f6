//! Docker helpers for broker-backed tests.

use testcontainers::{
    core::{IntoContainerPort, WaitFor},
    runners::AsyncRunner,
    ContainerAsync, GenericImage, ImageExt,
};

pub const NATS_USER: &str = "nats";
pub const NATS_PASSWORD: &str = "nats";

/// A JetStream-enabled NATS server running in Docker.
pub struct NatsContainer {
    #[allow(dead_code)]
    container: ContainerAsync<GenericImage>,
    /// The host port mapped to the container's client port 4222.
    pub host_port: u16,
}

impl NatsContainer {
    pub async fn start() -> anyhow::Result<Self> {
        let image = GenericImage::new("nats", "2.10")
            .with_exposed_port(4222.tcp())
            .with_wait_for(WaitFor::message_on_stderr("Server is ready"))
            .with_cmd(["-js", "--user", NATS_USER, "--pass", NATS_PASSWORD]);

        let container = image.start().await?;
        let host_port = container.get_host_port_ipv4(4222).await?;

        Ok(Self {
            container,
            host_port,
        })
    }

    pub fn url(&self) -> String {
        format!("nats://127.0.0.1:{}", self.host_port)
    }
}
