// /////////////////////////////////////////////////////////////////////////////
// Object Vault
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Load-balancer Worker (§4.12): a single dedicated loop that dequeues a
//! request, snapshots the healthy node set, lets the scheduler policy
//! pick one, sleeps a simulated-latency interval, acquires that node's
//! forwarding permit, and forwards to the Aggregator's HTTP API.
//!
//! The blocking `RequestQueue::dequeue_timeout` call runs on Tokio's
//! blocking pool so the monitor's condvar wait never stalls the async
//! executor, matching the "single dedicated thread" model of §5 while
//! keeping the rest of the loop on the same async stack as everything
//! else in this crate.

use std::collections::HashMap;
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex as SyncMutex;
use rand::Rng;
use reqwest::header::HeaderMap;
use tokio::sync::{oneshot, watch, Semaphore};

use objectvault_domain::value_objects::RequestId;
use objectvault_domain::ObjectVaultError;

use super::super::queue::RequestQueue;
use super::super::registry::NodeRegistry;
use super::super::scheduler::SchedulerPolicy;

/// What the worker actually forwards for a given dequeued `Request`. The
/// HTTP handler that enqueued the request registers one of these keyed
/// by the request id and awaits `respond_to` for the result.
pub struct PendingForward {
    pub method: reqwest::Method,
    pub path: String,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub respond_to: oneshot::Sender<Result<Bytes, ObjectVaultError>>,
}

#[derive(Debug, Clone)]
pub struct LoadBalancerWorkerConfig {
    pub latency_min: Duration,
    pub latency_max: Duration,
    pub permit_count_per_node: usize,
    pub aggregator_port: u16,
    pub dequeue_poll: Duration,
}

impl Default for LoadBalancerWorkerConfig {
    fn default() -> Self {
        Self {
            latency_min: Duration::from_millis(1000),
            latency_max: Duration::from_millis(5000),
            permit_count_per_node: 1,
            aggregator_port: 9090,
            dequeue_poll: Duration::from_millis(500),
        }
    }
}

pub struct LoadBalancerWorker {
    queue: Arc<RequestQueue>,
    registry: Arc<NodeRegistry>,
    policy: SchedulerPolicy,
    cursor: AtomicUsize,
    http: reqwest::Client,
    config: LoadBalancerWorkerConfig,
    permits: SyncMutex<HashMap<String, Arc<Semaphore>>>,
    pending: SyncMutex<HashMap<RequestId, PendingForward>>,
}

impl LoadBalancerWorker {
    pub fn new(
        queue: Arc<RequestQueue>,
        registry: Arc<NodeRegistry>,
        policy: SchedulerPolicy,
        config: LoadBalancerWorkerConfig,
    ) -> Self {
        Self {
            queue,
            registry,
            policy,
            cursor: AtomicUsize::new(0),
            http: reqwest::Client::new(),
            config,
            permits: SyncMutex::new(HashMap::new()),
            pending: SyncMutex::new(HashMap::new()),
        }
    }

    /// Registers what should happen once `request_id`'s `Request` reaches
    /// the front of the queue. Called by the HTTP handler before
    /// enqueueing.
    pub fn register_forward(&self, request_id: RequestId, forward: PendingForward) {
        self.pending.lock().insert(request_id, forward);
    }

    fn permit_for(&self, endpoint: &str) -> Arc<Semaphore> {
        self.permits
            .lock()
            .entry(endpoint.to_string())
            .or_insert_with(|| Arc::new(Semaphore::new(self.config.permit_count_per_node)))
            .clone()
    }

    /// One iteration: dequeue, pick a node, simulate latency, forward
    /// under the node's permit. Returns `false` when the queue's
    /// blocking wait was interrupted by shutdown so `run` can exit.
    async fn run_once(&self) {
        let queue = self.queue.clone();
        let poll = self.config.dequeue_poll;
        let request = match tokio::task::spawn_blocking(move || queue.dequeue_timeout(poll)).await {
            Ok(Some(r)) => r,
            Ok(None) => return,
            Err(e) => {
                tracing::error!(error = %e, "dequeue task panicked");
                return;
            }
        };

        let Some(forward) = self.pending.lock().remove(&request.id) else {
            tracing::warn!(request_id = %request.id, "dequeued request with no registered forward");
            return;
        };

        let healthy = self.registry.healthy();
        let node = match self.policy.select(&healthy, &self.cursor) {
            Ok(node) => node,
            Err(e) => {
                let _ = forward.respond_to.send(Err(e));
                return;
            }
        };

        let latency_ms = rand::rng().random_range(
            self.config.latency_min.as_millis() as u64..=self.config.latency_max.as_millis() as u64,
        );
        tokio::time::sleep(Duration::from_millis(latency_ms)).await;

        let permit = self.permit_for(&node.endpoint);
        let _permit = match permit.acquire().await {
            Ok(p) => p,
            Err(_) => {
                let _ = forward
                    .respond_to
                    .send(Err(ObjectVaultError::Cancelled("permit acquisition interrupted".into())));
                return;
            }
        };

        let host = node.endpoint.trim_start_matches("sftp://").trim_start_matches("http://");
        let url = format!("http://{host}:{}{}", self.config.aggregator_port, forward.path);
        let result = self
            .http
            .request(forward.method.clone(), &url)
            .headers(forward.headers.clone())
            .body(forward.body)
            .send()
            .await
            .map_err(|e| ObjectVaultError::Transport(format!("forward to {url} failed: {e}")));

        let outcome = match result {
            Ok(response) => response
                .bytes()
                .await
                .map_err(|e| ObjectVaultError::Transport(format!("reading response from {url} failed: {e}"))),
            Err(e) => Err(e),
        };

        match &outcome {
            Ok(_) => tracing::info!(endpoint = %node.endpoint, operation = ?request.operation, "forward succeeded"),
            Err(e) => tracing::warn!(endpoint = %node.endpoint, error = %e, "forward failed"),
        }
        let _ = forward.respond_to.send(outcome);
    }

    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        loop {
            if *shutdown.borrow() {
                tracing::info!("lb worker shutting down");
                return;
            }
            tokio::select! {
                _ = self.run_once() => {}
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        tracing::info!("lb worker shutting down");
                        return;
                    }
                }
            }
        }
    }
}
