//! Identifier strategies for registered instances.

use crate::metadata::{resolve_metadata, ID_GENERATOR_KEY};
use crate::types::{ContainerDescriptor, RegistrationRecord};

/// Value of `registrator.id_generator` selecting [`NamingStrategy::ContainerName`].
pub const CONTAINER_NAME_GENERATOR: &str = "container_name";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NamingStrategy {
    /// `<address with _>_<container>_<port>`
    #[default]
    IpAddress,
    /// `<container>_<service>`
    ContainerName,
}

impl NamingStrategy {
    /// Picks the strategy requested by the container's metadata.
    pub fn select(descriptor: &ContainerDescriptor) -> Self {
        match resolve_metadata(descriptor, ID_GENERATOR_KEY).as_str() {
            CONTAINER_NAME_GENERATOR => NamingStrategy::ContainerName,
            _ => NamingStrategy::IpAddress,
        }
    }

    /// Computes the identifier for a record whose ip, port and service are set.
    pub fn identify(&self, descriptor: &ContainerDescriptor, record: &RegistrationRecord) -> String {
        let name = sanitize_container_name(&descriptor.name);
        match self {
            NamingStrategy::IpAddress => format!(
                "{}_{}_{}",
                record.ip.replace('.', "_"),
                name,
                record.port
            ),
            NamingStrategy::ContainerName => format!("{}_{}", name, record.service),
        }
    }
}

/// Drops the runtime's leading `/` and flattens any other `/` to `_`.
pub fn sanitize_container_name(name: &str) -> String {
    name.trim_start_matches('/').replace('/', "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn container(name: &str) -> ContainerDescriptor {
        ContainerDescriptor {
            name: name.into(),
            ..Default::default()
        }
    }

    fn record() -> RegistrationRecord {
        RegistrationRecord {
            application: "Test".into(),
            platform: "TST".into(),
            service: "BACK".into(),
            port: "1234".into(),
            ip: "1.2.3.4".into(),
            ..Default::default()
        }
    }

    fn with_generator(value: &str) -> ContainerDescriptor {
        let mut d = container("/test");
        d.labels
            .insert(ID_GENERATOR_KEY.to_string(), value.to_string());
        d
    }

    #[test]
    fn ip_strategy_joins_address_name_and_port() {
        let id = NamingStrategy::IpAddress.identify(&container("/test"), &record());
        assert_eq!(id, "1_2_3_4_test_1234");

        let id = NamingStrategy::IpAddress.identify(&container("test"), &record());
        assert_eq!(id, "1_2_3_4_test_1234");
    }

    #[test]
    fn container_strategy_joins_name_and_service() {
        let id = NamingStrategy::ContainerName.identify(&container("/test"), &record());
        assert_eq!(id, "test_BACK");
    }

    #[test]
    fn strategies_share_name_sanitizing() {
        assert_eq!(sanitize_container_name("/a/b"), "a_b");
        let d = container("/a/b");
        assert_eq!(
            NamingStrategy::IpAddress.identify(&d, &record()),
            "1_2_3_4_a_b_1234"
        );
        assert_eq!(NamingStrategy::ContainerName.identify(&d, &record()), "a_b_BACK");
    }

    #[test]
    fn selects_container_strategy_only_on_exact_value() {
        assert_eq!(
            NamingStrategy::select(&with_generator("container_name")),
            NamingStrategy::ContainerName
        );
        assert_eq!(
            NamingStrategy::select(&with_generator("pouet")),
            NamingStrategy::IpAddress
        );
        assert_eq!(
            NamingStrategy::select(&container("/test")),
            NamingStrategy::IpAddress
        );
    }

    #[test]
    fn selection_reads_environment_fallback() {
        let mut d = container("/test");
        d.env.push("registrator.id_generator=container_name".into());
        assert_eq!(NamingStrategy::select(&d), NamingStrategy::ContainerName);
    }
}
