//! Metadata lookup on container descriptors.
//!
//! Registration facts come from container labels, with environment
//! variables as a fallback for images that cannot be relabelled.  The
//! lookup walks [`METADATA_SOURCES`] in order and returns the first
//! non-empty value; an empty string means "not configured".

use crate::types::{ContainerDescriptor, ExposedPort};

pub const APPLICATION_KEY: &str = "application.name";
pub const PLATFORM_KEY: &str = "platform.name";
pub const ID_GENERATOR_KEY: &str = "registrator.id_generator";

/// Where a metadata value can be read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataSource {
    Labels,
    Environment,
}

/// Lookup order, first match wins.
pub const METADATA_SOURCES: [MetadataSource; 2] =
    [MetadataSource::Labels, MetadataSource::Environment];

impl MetadataSource {
    fn lookup<'a>(&self, descriptor: &'a ContainerDescriptor, key: &str) -> Option<&'a str> {
        match self {
            MetadataSource::Labels => descriptor.labels.get(key).map(String::as_str),
            MetadataSource::Environment => descriptor.env.iter().find_map(|entry| {
                let (name, value) = entry.split_once('=')?;
                (name == key).then_some(value)
            }),
        }
    }
}

/// Returns the value of `key`, or an empty string when no source sets it.
pub fn resolve_metadata(descriptor: &ContainerDescriptor, key: &str) -> String {
    METADATA_SOURCES
        .iter()
        .filter_map(|source| source.lookup(descriptor, key))
        .find(|value| !value.is_empty())
        .unwrap_or_default()
        .to_string()
}

/// Label key naming the service behind an exposed port,
/// e.g. `service.8080_tcp.name`.
pub fn service_key(port: &ExposedPort) -> String {
    format!("service.{}_{}.name", port.port, port.protocol)
}
