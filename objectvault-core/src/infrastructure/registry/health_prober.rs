// /////////////////////////////////////////////////////////////////////////////
// Object Vault
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Health Prober (§4.10): a periodic `tokio::time::interval` tick loop
//! rather than an implicit background task, per Design Notes §9's
//! "coroutine-style fire-and-forget" guidance - the loop is started
//! explicitly from a binary's `main` and accepts a shutdown signal.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;

use objectvault_domain::value_objects::EventKind;
use objectvault_domain::ObjectVaultError;

use super::NodeRegistry;

/// Abstracts the liveness check itself so the tick loop is testable
/// without a real network round-trip to a backend.
#[async_trait]
pub trait LivenessCheck: Send + Sync {
    async fn probe(&self, endpoint: &str) -> Result<(), ObjectVaultError>;
}

/// Reference liveness check: a bare TCP connect to the endpoint's SFTP
/// port, timing out after `timeout`. Good enough to detect an unreachable
/// or down backend without authenticating against it.
pub struct TcpLivenessCheck {
    port: u16,
    timeout: Duration,
}

impl TcpLivenessCheck {
    pub fn new(port: u16, timeout: Duration) -> Self {
        Self { port, timeout }
    }
}

#[async_trait]
impl LivenessCheck for TcpLivenessCheck {
    async fn probe(&self, endpoint: &str) -> Result<(), ObjectVaultError> {
        let host = endpoint.trim_start_matches("sftp://").trim_start_matches("http://");
        let addr = format!("{host}:{}", self.port);
        tokio::time::timeout(self.timeout, tokio::net::TcpStream::connect(&addr))
            .await
            .map_err(|_| ObjectVaultError::Transport(format!("probe to {addr} timed out")))?
            .map_err(|e| ObjectVaultError::Transport(format!("probe to {addr} failed: {e}")))?;
        Ok(())
    }
}

pub struct HealthProber {
    registry: Arc<NodeRegistry>,
    check: Arc<dyn LivenessCheck>,
    interval: Duration,
    failure_threshold: u32,
}

impl HealthProber {
    pub fn new(
        registry: Arc<NodeRegistry>,
        check: Arc<dyn LivenessCheck>,
        interval: Duration,
        failure_threshold: u32,
    ) -> Self {
        Self {
            registry,
            check,
            interval,
            failure_threshold,
        }
    }

    /// Runs one probe pass across every registered node, updating health
    /// state and returning the endpoints whose state flipped this tick.
    pub async fn tick(&self) -> Vec<(String, bool)> {
        let mut transitions = Vec::new();
        for node in self.registry.all() {
            let probe_failed = match self.check.probe(&node.endpoint).await {
                Ok(()) => {
                    let was_unhealthy = !node.is_healthy();
                    self.registry.with_node_mut(&node.endpoint, |n| n.record_probe_success());
                    if was_unhealthy {
                        transitions.push((node.endpoint.clone(), true));
                    }
                    None
                }
                Err(_) => {
                    let mut flipped = false;
                    self.registry.with_node_mut(&node.endpoint, |n| {
                        flipped = n.record_probe_failure(self.failure_threshold);
                    });
                    if flipped {
                        transitions.push((node.endpoint.clone(), false));
                    }
                    Some(())
                }
            };
            if probe_failed.is_some() {
                tracing::debug!(endpoint = %node.endpoint, "probe failed");
            }
        }
        for (endpoint, recovered) in &transitions {
            tracing::info!(
                endpoint,
                recovered,
                event = %EventKind::HealthTransition,
                "storage node health transition"
            );
        }
        transitions
    }

    /// Runs `tick` on `self.interval` until `shutdown` fires.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.tick().await;
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        tracing::info!("health prober shutting down");
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
    use objectvault_domain::entities::StorageNode;
    use std::collections::HashSet;
    use std::sync::Mutex as StdMutex;

    struct FlakyCheck {
        down: StdMutex<HashSet<String>>,
    }

    #[async_trait]
    impl LivenessCheck for FlakyCheck {
        async fn probe(&self, endpoint: &str) -> Result<(), ObjectVaultError> {
            if self.down.lock().unwrap().contains(endpoint) {
                Err(ObjectVaultError::Transport("unreachable".into()))
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test]
    async fn node_becomes_unhealthy_after_threshold_failures() {
        let registry = Arc::new(NodeRegistry::new());
        registry.register(StorageNode::new("b1", "sftp://b1", 1));
        registry.register(StorageNode::new("b2", "sftp://b2", 1));

        let mut down = HashSet::new();
        down.insert("sftp://b2".to_string());
        let check: Arc<dyn LivenessCheck> = Arc::new(FlakyCheck {
            down: StdMutex::new(down),
        });

        let prober = HealthProber::new(registry.clone(), check, Duration::from_millis(10), 2);
        prober.tick().await;
        assert_eq!(registry.healthy().len(), 2); // first failure doesn't trip yet
        let transitions = prober.tick().await;
        assert_eq!(transitions, vec![("sftp://b2".to_string(), false)]);
        assert_eq!(registry.healthy().len(), 1);
    }
}
