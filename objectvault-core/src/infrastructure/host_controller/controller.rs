// /////////////////////////////////////////////////////////////////////////////
// Object Vault
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Host Controller (§4.14): subscribes to the scaling topic and
//! reconciles the managed backend fleet by count, so redelivering the
//! same `up N` / `down N` event (QoS at-least-once, §6) is idempotent
//! (property 8). Also runs a periodic health scan that replaces any
//! container the executor reports as not running.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tokio::sync::watch;

use objectvault_domain::entities::StorageNode;

use super::super::bus::MessageBus;
use super::super::registry::NodeRegistry;
use super::executor::{CommandExecutor, ContainerHandle, ContainerSpec, ContainerState};

#[derive(Debug, Clone)]
pub struct HostControllerConfig {
    pub image: String,
    pub network: String,
    pub internal_port: u16,
    pub volume_root: String,
    pub health_scan_interval: Duration,
    pub scale_topic: String,
}

impl Default for HostControllerConfig {
    fn default() -> Self {
        Self {
            image: "objectvault/sftp-backend:latest".into(),
            network: "objectvault-net".into(),
            internal_port: 22,
            volume_root: "/var/lib/objectvault/backends".into(),
            health_scan_interval: Duration::from_secs(30),
            scale_topic: super::super::bus::SCALE_TOPIC.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ScaleWireMessage {
    action: String,
    count: usize,
}

struct ManagedContainer {
    handle: ContainerHandle,
    spec: ContainerSpec,
}

pub struct HostController<E: CommandExecutor> {
    executor: Arc<E>,
    registry: Arc<NodeRegistry>,
    bus: Arc<MessageBus>,
    config: HostControllerConfig,
    managed: parking_lot::Mutex<Vec<ManagedContainer>>,
    next_ordinal: std::sync::atomic::AtomicUsize,
}

impl<E: CommandExecutor> HostController<E> {
    pub fn new(executor: Arc<E>, registry: Arc<NodeRegistry>, bus: Arc<MessageBus>, config: HostControllerConfig) -> Self {
        Self {
            executor,
            registry,
            bus,
            config,
            managed: parking_lot::Mutex::new(Vec::new()),
            next_ordinal: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    fn spec_for_next_instance(&self) -> ContainerSpec {
        let ordinal = self.next_ordinal.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        let name = format!("objectvault-backend-{ordinal}");
        ContainerSpec {
            volume_host_path: format!("{}/{name}", self.config.volume_root),
            volume_container_path: "/data".into(),
            name,
            image: self.config.image.clone(),
            network: self.config.network.clone(),
            internal_port: self.config.internal_port,
        }
    }

    async fn scale_up_to(&self, target: usize) {
        let current = self.managed.lock().len();
        for _ in current..target {
            let spec = self.spec_for_next_instance();
            match self.executor.start(&spec).await {
                Ok(handle) => {
                    tracing::info!(name = %spec.name, "started backend container");
                    self.registry.register(StorageNode::new(spec.name.clone(), spec.name.clone(), 1));
                    self.managed.lock().push(ManagedContainer { handle, spec });
                }
                Err(e) => tracing::warn!(error = %e, "failed to start backend container"),
            }
        }
    }

    async fn scale_down_to(&self, target: usize) {
        loop {
            let candidate = {
                let mut managed = self.managed.lock();
                if managed.len() <= target {
                    break;
                }
                managed.pop()
            };
            let Some(container) = candidate else { break };
            if let Err(e) = self.executor.stop(&container.handle).await {
                tracing::warn!(error = %e, name = %container.spec.name, "failed to stop backend container");
            }
            self.registry.unregister(&container.spec.name);
        }
    }

    /// Reconciles the managed fleet to `event`'s declared count - this
    /// is what makes repeated `up N` / `down N` deliveries idempotent.
    async fn reconcile(&self, event: &ScaleWireMessage) {
        match event.action.as_str() {
            "up" => self.scale_up_to(event.count).await,
            "down" => self.scale_down_to(event.count).await,
            _ => {}
        }
    }

    /// Stops and restarts any managed container the executor no longer
    /// reports as running.
    pub async fn health_scan(&self) {
        let specs: Vec<(ContainerHandle, ContainerSpec)> = self
            .managed
            .lock()
            .iter()
            .map(|m| (m.handle.clone(), m.spec.clone()))
            .collect();

        for (handle, spec) in specs {
            match self.executor.inspect(&handle).await {
                Ok(ContainerState::Running) => {}
                _ => {
                    tracing::warn!(name = %spec.name, "managed container unhealthy, replacing");
                    let _ = self.executor.stop(&handle).await;
                    self.managed.lock().retain(|m| m.handle != handle);
                    self.registry.unregister(&spec.name);
                    if let Ok(new_handle) = self.executor.start(&spec).await {
                        self.registry.register(StorageNode::new(spec.name.clone(), spec.name.clone(), 1));
                        self.managed.lock().push(ManagedContainer { handle: new_handle, spec });
                    }
                }
            }
        }
    }

    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut scale_events = match self.bus.subscribe(&self.config.scale_topic).await {
            Ok(rx) => rx,
            Err(e) => {
                tracing::error!(error = %e, "failed to subscribe to scale topic");
                return;
            }
        };
        let mut health_ticker = tokio::time::interval(self.config.health_scan_interval);

        loop {
            tokio::select! {
                message = scale_events.recv() => {
                    match message {
                        Ok(bytes) => match serde_json::from_slice::<ScaleWireMessage>(&bytes) {
                            Ok(event) => self.reconcile(&event).await,
                            Err(_) => tracing::debug!("ignoring non-scale message on scale topic"),
                        },
                        Err(_) => tracing::warn!("scale event channel lagged or closed"),
                    }
                }
                _ = health_ticker.tick() => {
                    self.health_scan().await;
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        tracing::info!("host controller shutting down");
                        return;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use objectvault_domain::ObjectVaultError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeExecutor {
        started: AtomicUsize,
        stopped: AtomicUsize,
    }

    impl FakeExecutor {
        fn new() -> Self {
            Self {
                started: AtomicUsize::new(0),
                stopped: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait::async_trait]
    impl CommandExecutor for FakeExecutor {
        async fn start(&self, spec: &ContainerSpec) -> Result<ContainerHandle, ObjectVaultError> {
            self.started.fetch_add(1, Ordering::SeqCst);
            Ok(ContainerHandle(spec.name.clone()))
        }

        async fn stop(&self, _handle: &ContainerHandle) -> Result<(), ObjectVaultError> {
            self.stopped.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn inspect(&self, _handle: &ContainerHandle) -> Result<ContainerState, ObjectVaultError> {
            Ok(ContainerState::Running)
        }
    }

    fn controller(executor: Arc<FakeExecutor>) -> HostController<FakeExecutor> {
        let bus = Arc::new(MessageBus::connect("127.0.0.1", 1, "test-host-controller"));
        let registry = Arc::new(NodeRegistry::new());
        HostController::new(executor, registry, bus, HostControllerConfig::default())
    }

    #[tokio::test]
    async fn redelivering_the_same_scale_up_event_is_idempotent() {
        let executor = Arc::new(FakeExecutor::new());
        let controller = controller(executor.clone());

        let event = ScaleWireMessage { action: "up".into(), count: 3 };
        controller.reconcile(&event).await;
        controller.reconcile(&event).await;
        controller.reconcile(&event).await;

        assert_eq!(executor.started.load(Ordering::SeqCst), 3, "redelivery must not start more than the declared count");
        assert_eq!(controller.managed.lock().len(), 3);
    }

    #[tokio::test]
    async fn scale_down_stops_containers_above_the_declared_count() {
        let executor = Arc::new(FakeExecutor::new());
        let controller = controller(executor.clone());

        controller.reconcile(&ScaleWireMessage { action: "up".into(), count: 3 }).await;
        controller.reconcile(&ScaleWireMessage { action: "down".into(), count: 1 }).await;

        assert_eq!(executor.stopped.load(Ordering::SeqCst), 2);
        assert_eq!(controller.managed.lock().len(), 1);

        // Redelivering the same "down 1" must be a no-op.
        controller.reconcile(&ScaleWireMessage { action: "down".into(), count: 1 }).await;
        assert_eq!(executor.stopped.load(Ordering::SeqCst), 2);
    }
}
