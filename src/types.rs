//! Data structures shared by the registration pipeline.
//!
//! [`ContainerDescriptor`] is the runtime-agnostic view of an inspected
//! container; the Docker runtime converts its inspection payload into
//! this shape so that the resolvers and the builder never touch
//! `bollard` types.  [`RegistrationRecord`] is what ends up in the
//! service directory, one per reachable service port.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

/// Protocol assumed when an exposed port key carries none.
const DEFAULT_PROTOCOL: &str = "tcp";

/// A port declared as listened-on by the container image.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExposedPort {
    pub port: u16,
    pub protocol: String,
}

impl ExposedPort {
    pub fn new(port: u16, protocol: impl Into<String>) -> Self {
        Self {
            port,
            protocol: protocol.into(),
        }
    }

    pub fn tcp(port: u16) -> Self {
        Self::new(port, DEFAULT_PROTOCOL)
    }
}

impl fmt::Display for ExposedPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.port, self.protocol)
    }
}

impl FromStr for ExposedPort {
    type Err = String;

    /// Parses the runtime's `<port>/<proto>` notation.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (port, protocol) = match s.split_once('/') {
            Some((port, protocol)) if !protocol.is_empty() => (port, Some(protocol)),
            Some((port, _)) => (port, None),
            None => (s, None),
        };
        let port = port
            .parse::<u16>()
            .map_err(|e| format!("invalid exposed port '{}': {}", s, e))?;
        Ok(match protocol {
            Some(protocol) => Self::new(port, protocol.to_ascii_lowercase()),
            None => Self::tcp(port),
        })
    }
}

/// A host-side binding published for an exposed port.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortBinding {
    pub host_ip: String,
    pub host_port: String,
}

impl PortBinding {
    pub fn new(host_ip: impl Into<String>, host_port: impl Into<String>) -> Self {
        Self {
            host_ip: host_ip.into(),
            host_port: host_port.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NetworkMode {
    Host,
    #[default]
    Bridged,
}

/// Everything the pipeline needs to know about one container.
#[derive(Debug, Clone, Default)]
pub struct ContainerDescriptor {
    pub name: String,
    pub labels: HashMap<String, String>,
    /// Raw `KEY=VALUE` entries, in the order the runtime reports them.
    pub env: Vec<String>,
    pub exposed_ports: Vec<ExposedPort>,
    pub port_bindings: HashMap<ExposedPort, Vec<PortBinding>>,
    pub network_mode: NetworkMode,
}

impl ContainerDescriptor {
    pub fn is_host_network(&self) -> bool {
        self.network_mode == NetworkMode::Host
    }
}

/// Lifecycle actions the dispatcher distinguishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventAction {
    Start,
    Stop,
    Die,
    Other(String),
}

impl From<&str> for EventAction {
    fn from(action: &str) -> Self {
        match action {
            "start" => EventAction::Start,
            "stop" => EventAction::Stop,
            "die" => EventAction::Die,
            other => EventAction::Other(other.to_string()),
        }
    }
}

impl From<String> for EventAction {
    fn from(action: String) -> Self {
        EventAction::from(action.as_str())
    }
}

/// A container event as delivered by the runtime's event stream.
#[derive(Debug, Clone)]
pub struct LifecycleEvent {
    pub action: EventAction,
    pub container_id: String,
    /// Container name attribute, when the runtime reports one.
    pub name: Option<String>,
    /// Seconds since the epoch.
    pub timestamp: Option<i64>,
}

impl LifecycleEvent {
    pub fn new(action: impl Into<EventAction>, container_id: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            container_id: container_id.into(),
            name: None,
            timestamp: None,
        }
    }
}

/// One reachable service instance, as sent to the service directory.
///
/// Built fresh for every qualifying exposed port of a started container
/// and dropped once transported.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrationRecord {
    pub id: String,
    pub hostname: String,
    pub ip: String,
    pub port: String,
    pub application: String,
    pub platform: String,
    pub service: String,
    pub context: BTreeMap<String, String>,
}

impl RegistrationRecord {
    /// Names of the required fields that are still empty.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("id", &self.id),
            ("application", &self.application),
            ("platform", &self.platform),
            ("service", &self.service),
            ("port", &self.port),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_empty())
        .map(|(field, _)| field)
        .collect()
    }

    /// Sets the identifier; the hostname follows it.
    pub fn assign_id(&mut self, id: String) {
        self.hostname = id.clone();
        self.id = id;
    }
}
