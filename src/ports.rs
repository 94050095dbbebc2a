//! Published-port resolution.

use crate::types::{ContainerDescriptor, ExposedPort};

/// Returns the host-reachable port for `exposed`, or `None` when the port
/// is not published.
///
/// Host-network containers publish no bindings, their exposed port is
/// reachable as-is.  Otherwise the first published binding wins.
pub fn resolve_public_port(descriptor: &ContainerDescriptor, exposed: &ExposedPort) -> Option<String> {
    if descriptor.is_host_network() {
        return Some(exposed.port.to_string());
    }
    descriptor
        .port_bindings
        .get(exposed)
        .and_then(|bindings| bindings.first())
        .map(|binding| binding.host_port.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{NetworkMode, PortBinding};

    fn bridged(bindings: Vec<PortBinding>) -> ContainerDescriptor {
        let mut d = ContainerDescriptor {
            exposed_ports: vec![ExposedPort::tcp(8080)],
            ..Default::default()
        };
        d.port_bindings.insert(ExposedPort::tcp(8080), bindings);
        d
    }

    #[test]
    fn first_binding_is_used() {
        let d = bridged(vec![
            PortBinding::new("0.0.0.0", "9090"),
            PortBinding::new("::", "9091"),
        ]);
        assert_eq!(
            resolve_public_port(&d, &ExposedPort::tcp(8080)).as_deref(),
            Some("9090")
        );
    }

    #[test]
    fn empty_or_absent_bindings_are_unreachable() {
        let d = bridged(Vec::new());
        assert_eq!(resolve_public_port(&d, &ExposedPort::tcp(8080)), None);
        assert_eq!(resolve_public_port(&d, &ExposedPort::tcp(8443)), None);
        assert_eq!(resolve_public_port(&d, &ExposedPort::new(8080, "udp")), None);
    }

    #[test]
    fn host_network_ignores_bindings() {
        let mut d = bridged(vec![PortBinding::new("0.0.0.0", "9090")]);
        d.network_mode = NetworkMode::Host;
        assert_eq!(
            resolve_public_port(&d, &ExposedPort::tcp(8080)).as_deref(),
            Some("8080")
        );
        assert_eq!(
            resolve_public_port(&d, &ExposedPort::tcp(7000)).as_deref(),
            Some("7000")
        );
    }
}
