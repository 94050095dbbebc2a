use super::ContainerRuntime;
use crate::error::RuntimeError;
use crate::types::{
    ContainerDescriptor, EventAction, ExposedPort, LifecycleEvent, NetworkMode, PortBinding,
};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use bollard::container::ListContainersOptions;
use bollard::models::{ContainerInspectResponse, EventMessage};
use bollard::system::EventsOptions;
use bollard::Docker;
use futures_util::stream::StreamExt;
use log::{debug, error, info, warn};
use std::collections::HashMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::mpsc;
use tokio::time::sleep;

const HOST_NETWORK: &str = "host";
const RECONNECT_DELAY: Duration = Duration::from_secs(2);
const SOCKET_TIMEOUT_SECS: u64 = 120;

pub struct DockerRuntime {
    docker: Docker,
    register_existing: bool,
}

impl DockerRuntime {
    /// Connects to the Docker daemon and checks that it answers.
    pub async fn connect(
        socket: Option<&str>,
        register_existing: bool,
    ) -> Result<Self, RuntimeError> {
        let docker = match socket {
            Some(path) => {
                Docker::connect_with_socket(path, SOCKET_TIMEOUT_SECS, bollard::API_DEFAULT_VERSION)
            }
            None => Docker::connect_with_local_defaults(),
        }
        .map_err(|e| RuntimeError::Connection(format!("failed to connect to docker: {}", e)))?;

        docker
            .ping()
            .await
            .map_err(|e| RuntimeError::Connection(format!("docker daemon unreachable: {}", e)))?;

        Ok(Self {
            docker,
            register_existing,
        })
    }

    /// Emits a synthetic `start` for every running container.
    async fn announce_running(&self, event_tx: &mpsc::Sender<LifecycleEvent>) -> Result<()> {
        let opts = ListContainersOptions::<String> {
            all: false,
            ..Default::default()
        };
        let containers = match self.docker.list_containers(Some(opts)).await {
            Ok(containers) => containers,
            Err(e) => {
                warn!("Failed to list running containers: {}", e);
                return Ok(());
            }
        };
        info!("Initial scan found {} containers", containers.len());

        for c in containers {
            let Some(id) = c.id else { continue };
            let mut event = LifecycleEvent::new(EventAction::Start, id);
            event.name = c
                .names
                .as_ref()
                .and_then(|n| n.first())
                .map(|n| n.trim_start_matches('/').to_string());
            if event_tx.send(event).await.is_err() {
                return Err(anyhow!("Event channel closed"));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn monitor(&self, event_tx: mpsc::Sender<LifecycleEvent>) -> Result<()> {
        // Events newer than `since` are replayed on (re)subscription, so a
        // container starting during the initial scan or a reconnect is not lost.
        let mut since = None;
        if self.register_existing {
            since = Some(unix_timestamp());
            self.announce_running(&event_tx).await?;
        }

        loop {
            let opts = EventsOptions::<String> {
                since: since.take(),
                filters: HashMap::from([("type".to_string(), vec!["container".to_string()])]),
                ..Default::default()
            };
            let mut stream = self.docker.events(Some(opts));

            info!("Listening for Docker events...");
            while let Some(msg) = stream.next().await {
                match msg {
                    Ok(message) => {
                        let Some(event) = lifecycle_event(message) else {
                            continue;
                        };
                        debug!(
                            "Container event: {:?} for {}",
                            event.action, event.container_id
                        );
                        if event_tx.send(event).await.is_err() {
                            error!("Failed to forward container event: channel closed");
                            return Err(anyhow!("Event channel closed"));
                        }
                    }
                    Err(e) => {
                        warn!("Error in Docker event stream: {}", e);
                        break; // Break inner loop to resubscribe
                    }
                }
            }

            since = Some(unix_timestamp());
            warn!("Docker event stream ended. Reconnecting in 2s...");
            sleep(RECONNECT_DELAY).await;
        }
    }

    async fn inspect(&self, container_id: &str) -> Result<ContainerDescriptor, RuntimeError> {
        let detail = self
            .docker
            .inspect_container(container_id, None)
            .await
            .map_err(|e| match e {
                bollard::errors::Error::DockerResponseServerError {
                    status_code: 404, ..
                } => RuntimeError::ContainerNotFound(container_id.to_string()),
                other => RuntimeError::Api(format!("inspect container failed: {}", other)),
            })?;
        Ok(descriptor_from_inspect(detail))
    }
}

fn unix_timestamp() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
        .to_string()
}

fn lifecycle_event(message: EventMessage) -> Option<LifecycleEvent> {
    let actor = message.actor?;
    let container_id = actor.id.filter(|id| !id.is_empty())?;
    let action = message.action.unwrap_or_default();
    let name = actor
        .attributes
        .and_then(|mut attributes| attributes.remove("name"));

    Some(LifecycleEvent {
        action: EventAction::from(action),
        container_id,
        name,
        timestamp: message.time,
    })
}

fn descriptor_from_inspect(detail: ContainerInspectResponse) -> ContainerDescriptor {
    let config = detail.config.unwrap_or_default();
    let settings = detail.network_settings.unwrap_or_default();

    let host_mode = detail
        .host_config
        .as_ref()
        .and_then(|h| h.network_mode.as_deref())
        == Some(HOST_NETWORK);
    let on_host_network = settings
        .networks
        .as_ref()
        .is_some_and(|networks| networks.contains_key(HOST_NETWORK));

    let mut exposed_ports: Vec<ExposedPort> = config
        .exposed_ports
        .unwrap_or_default()
        .keys()
        .filter_map(|key| parse_port_key(key))
        .collect();
    exposed_ports.sort();

    let port_bindings = settings
        .ports
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(key, bindings)| {
            let port = parse_port_key(&key)?;
            let bindings = bindings
                .unwrap_or_default()
                .into_iter()
                .map(|b| {
                    PortBinding::new(b.host_ip.unwrap_or_default(), b.host_port.unwrap_or_default())
                })
                .collect();
            Some((port, bindings))
        })
        .collect();

    ContainerDescriptor {
        name: detail.name.unwrap_or_default(),
        labels: config.labels.unwrap_or_default(),
        env: config.env.unwrap_or_default(),
        exposed_ports,
        port_bindings,
        network_mode: if host_mode || on_host_network {
            NetworkMode::Host
        } else {
            NetworkMode::Bridged
        },
    }
}

fn parse_port_key(key: &str) -> Option<ExposedPort> {
    match key.parse() {
        Ok(port) => Some(port),
        Err(e) => {
            warn!("Ignoring exposed port: {}", e);
            None
        }
    }
}
