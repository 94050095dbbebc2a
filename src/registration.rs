//! Builds registration records from an inspected container.

use log::debug;

use crate::metadata::{resolve_metadata, service_key, APPLICATION_KEY, PLATFORM_KEY};
use crate::naming::NamingStrategy;
use crate::ports::resolve_public_port;
use crate::types::{ContainerDescriptor, RegistrationRecord};

/// Produces one record per exposed port that has a service label and a
/// reachable host port.  `address` is the IP this host advertises.
pub fn build_registrations(descriptor: &ContainerDescriptor, address: &str) -> Vec<RegistrationRecord> {
    if descriptor.exposed_ports.is_empty() {
        debug!("No exposed ports: container={}", descriptor.name);
        return Vec::new();
    }

    let application = resolve_metadata(descriptor, APPLICATION_KEY);
    if application.is_empty() {
        debug!(
            "Metadata is missing: container={} key={}",
            descriptor.name, APPLICATION_KEY
        );
        return Vec::new();
    }
    let platform = resolve_metadata(descriptor, PLATFORM_KEY);
    if platform.is_empty() {
        debug!(
            "Metadata is missing: container={} key={}",
            descriptor.name, PLATFORM_KEY
        );
        return Vec::new();
    }

    let strategy = NamingStrategy::select(descriptor);
    let mut records = Vec::new();

    for exposed in &descriptor.exposed_ports {
        let key = service_key(exposed);
        let service = resolve_metadata(descriptor, &key);
        if service.is_empty() {
            debug!("Label is missing: container={} label={}", descriptor.name, key);
            continue;
        }

        let Some(port) = resolve_public_port(descriptor, exposed) else {
            debug!("Port not published: container={} port={}", descriptor.name, exposed);
            continue;
        };
        debug!("Analyze container: container={} port={}", descriptor.name, exposed);

        let mut record = RegistrationRecord {
            ip: address.to_string(),
            port,
            application: application.clone(),
            platform: platform.clone(),
            service,
            ..Default::default()
        };
        let id = strategy.identify(descriptor, &record);
        record.assign_id(id);
        records.push(record);
    }

    records
}
