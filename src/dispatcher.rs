//! Lifecycle event dispatch.
//!
//! Events are handled one after another: a `start` runs inspection,
//! record building and transport to completion before the next event is
//! read.  Handlers keep no state between events.

use std::sync::Arc;

use log::{info, warn};
use tokio::sync::mpsc;

use crate::registration::build_registrations;
use crate::runtime::ContainerRuntime;
use crate::transport::Registry;
use crate::types::{EventAction, LifecycleEvent};

pub struct Dispatcher<R, S> {
    runtime: Arc<R>,
    registry: S,
    address: String,
}

impl<R, S> Dispatcher<R, S>
where
    R: ContainerRuntime,
    S: Registry,
{
    pub fn new(runtime: Arc<R>, registry: S, address: String) -> Self {
        Self {
            runtime,
            registry,
            address,
        }
    }

    /// Consumes events until the channel closes.
    pub async fn run(self, mut event_rx: mpsc::Receiver<LifecycleEvent>) {
        while let Some(event) = event_rx.recv().await {
            self.handle(&event).await;
        }
        info!("Event channel closed, dispatcher stopping");
    }

    pub async fn handle(&self, event: &LifecycleEvent) {
        match &event.action {
            EventAction::Start => self.on_start(event).await,
            EventAction::Stop | EventAction::Die => {
                info!(
                    "Container removed: action={:?} id={} name={} time={}",
                    event.action,
                    event.container_id,
                    event.name.as_deref().unwrap_or("-"),
                    event.timestamp.unwrap_or_default()
                );
            }
            EventAction::Other(_) => {}
        }
    }

    async fn on_start(&self, event: &LifecycleEvent) {
        let descriptor = match self.runtime.inspect(&event.container_id).await {
            Ok(descriptor) => descriptor,
            Err(e) => {
                warn!(
                    "Cannot register instance: container={} error={}",
                    event.container_id, e
                );
                return;
            }
        };

        for record in build_registrations(&descriptor, &self.address) {
            self.registry.register(&record).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RuntimeError;
    use crate::types::{ContainerDescriptor, ExposedPort, PortBinding, RegistrationRecord};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct StaticRuntime {
        containers: HashMap<String, ContainerDescriptor>,
    }

    #[async_trait]
    impl ContainerRuntime for StaticRuntime {
        async fn monitor(&self, _event_tx: mpsc::Sender<LifecycleEvent>) -> anyhow::Result<()> {
            Ok(())
        }

        async fn inspect(&self, container_id: &str) -> Result<ContainerDescriptor, RuntimeError> {
            self.containers
                .get(container_id)
                .cloned()
                .ok_or_else(|| RuntimeError::ContainerNotFound(container_id.to_string()))
        }
    }

    #[derive(Clone, Default)]
    struct RecordingRegistry {
        records: Arc<Mutex<Vec<RegistrationRecord>>>,
    }

    impl RecordingRegistry {
        fn ids(&self) -> Vec<String> {
            self.records
                .lock()
                .unwrap()
                .iter()
                .map(|r| r.id.clone())
                .collect()
        }
    }

    #[async_trait]
    impl Registry for RecordingRegistry {
        async fn register(&self, record: &RegistrationRecord) {
            self.records.lock().unwrap().push(record.clone());
        }
    }

    fn service(name: &str, host_port: &str) -> ContainerDescriptor {
        let mut d = ContainerDescriptor {
            name: format!("/{}", name),
            exposed_ports: vec![ExposedPort::tcp(8080)],
            ..Default::default()
        };
        for (k, v) in [
            ("application.name", "foo"),
            ("platform.name", "bar"),
            ("service.8080_tcp.name", "backend1"),
        ] {
            d.labels.insert(k.into(), v.into());
        }
        d.port_bindings.insert(
            ExposedPort::tcp(8080),
            vec![PortBinding::new("0.0.0.0", host_port)],
        );
        d
    }

    fn dispatcher(
        containers: &[(&str, ContainerDescriptor)],
    ) -> (Dispatcher<StaticRuntime, RecordingRegistry>, RecordingRegistry) {
        let runtime = StaticRuntime {
            containers: containers
                .iter()
                .map(|(id, d)| (id.to_string(), d.clone()))
                .collect(),
        };
        let registry = RecordingRegistry::default();
        let dispatcher = Dispatcher::new(Arc::new(runtime), registry.clone(), "10.0.0.5".into());
        (dispatcher, registry)
    }

    #[tokio::test]
    async fn start_registers_container() {
        let (dispatcher, registry) = dispatcher(&[("c1", service("web", "9090"))]);
        dispatcher.handle(&LifecycleEvent::new("start", "c1")).await;
        assert_eq!(registry.ids(), vec!["10_0_0_5_web_9090"]);
    }

    #[tokio::test]
    async fn stop_die_and_other_actions_do_not_register() {
        let (dispatcher, registry) = dispatcher(&[("c1", service("web", "9090"))]);
        for action in ["stop", "die", "create", "kill"] {
            dispatcher.handle(&LifecycleEvent::new(action, "c1")).await;
        }
        assert!(registry.ids().is_empty());
    }

    #[tokio::test]
    async fn inspection_failure_only_drops_that_event() {
        let (dispatcher, registry) = dispatcher(&[("c2", service("api", "9191"))]);
        let (tx, rx) = mpsc::channel(8);
        tx.send(LifecycleEvent::new("start", "gone")).await.unwrap();
        tx.send(LifecycleEvent::new("start", "c2")).await.unwrap();
        drop(tx);

        dispatcher.run(rx).await;
        assert_eq!(registry.ids(), vec!["10_0_0_5_api_9191"]);
    }

    #[tokio::test]
    async fn container_without_metadata_registers_nothing() {
        let mut d = service("web", "9090");
        d.labels.remove("platform.name");
        let (dispatcher, registry) = dispatcher(&[("c1", d)]);
        dispatcher.handle(&LifecycleEvent::new("start", "c1")).await;
        assert!(registry.ids().is_empty());
    }
}
