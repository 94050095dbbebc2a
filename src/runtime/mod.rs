use crate::error::RuntimeError;
use crate::types::{ContainerDescriptor, LifecycleEvent};
use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;

pub mod docker;
pub use docker::DockerRuntime;

#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Start watching the runtime for container lifecycle events.
    /// Events should be sent to the provided channel.
    async fn monitor(&self, event_tx: mpsc::Sender<LifecycleEvent>) -> Result<()>;

    /// Fetch the current descriptor of a container.
    async fn inspect(&self, container_id: &str) -> Result<ContainerDescriptor, RuntimeError>;
}
