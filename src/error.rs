//! Error types for the container runtime and the registration transport.

/// Failures talking to the container runtime.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("runtime connection error: {0}")]
    Connection(String),

    /// The container vanished between the event and the inspection.
    #[error("container not found: {0}")]
    ContainerNotFound(String),

    #[error("runtime api error: {0}")]
    Api(String),
}

/// Failures delivering a registration to the service directory.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("registration is incomplete, missing: {}", .0.join(", "))]
    Incomplete(Vec<&'static str>),

    #[error("failed to serialize registration: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("invalid service directory url: {0}")]
    InvalidUrl(String),

    #[error("failed to build http client: {0}")]
    Client(String),

    #[error("request to {url} failed: {source} (payload: {payload})")]
    Request {
        url: String,
        payload: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request to {url} returned {status} (payload: {payload})")]
    Status {
        url: String,
        payload: String,
        status: reqwest::StatusCode,
    },
}
