// /////////////////////////////////////////////////////////////////////////////
// Object Vault
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Scaling Publisher (§4.13): watches queue depth on a fixed interval and
//! emits publish-only scale signals, debounced so the same action never
//! fires twice in a row.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::json;
use tokio::sync::watch;

use objectvault_domain::entities::{ScaleAction, ScaleEvent};

use super::super::bus::{MessageBus, SCALE_TOPIC};
use super::super::metrics::Metrics;
use super::super::queue::RequestQueue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LastEmitted {
    Up,
    Down,
    Stable,
    None,
}

#[derive(Debug, Clone)]
pub struct ScalingPublisherConfig {
    pub check_interval: Duration,
    pub high_watermark: usize,
    pub low_watermark: usize,
    pub max_backends: usize,
    pub min_backends: usize,
}

impl Default for ScalingPublisherConfig {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_secs(10),
            high_watermark: 80,
            low_watermark: 10,
            max_backends: 5,
            min_backends: 1,
        }
    }
}

pub struct ScalingPublisher {
    queue: Arc<RequestQueue>,
    bus: Arc<MessageBus>,
    metrics: Arc<Metrics>,
    config: ScalingPublisherConfig,
    last_emitted: Mutex<LastEmitted>,
}

impl ScalingPublisher {
    pub fn new(queue: Arc<RequestQueue>, bus: Arc<MessageBus>, metrics: Arc<Metrics>, config: ScalingPublisherConfig) -> Self {
        Self {
            queue,
            bus,
            metrics,
            config,
            last_emitted: Mutex::new(LastEmitted::None),
        }
    }

    /// Evaluates the current queue depth once and publishes at most one
    /// message, honoring the debounce rule. Returns the emitted event, if
    /// any, for test/observability purposes.
    pub async fn tick(&self) -> Option<ScaleEvent> {
        let depth = self.queue.size();

        if depth > self.config.high_watermark {
            return self.emit_if_new(LastEmitted::Up, ScaleAction::Up, self.config.max_backends, depth).await;
        }
        if depth < self.config.low_watermark {
            return self
                .emit_if_new(LastEmitted::Down, ScaleAction::Down, self.config.min_backends, depth)
                .await;
        }

        let should_emit = {
            let mut last = self.last_emitted.lock();
            if *last == LastEmitted::Stable {
                false
            } else {
                *last = LastEmitted::Stable;
                true
            }
        };
        if should_emit {
            let _ = self
                .bus
                .publish_json(SCALE_TOPIC, &json!({"action": "stable", "count": 0, "queueSize": depth}))
                .await;
        }
        None
    }

    async fn emit_if_new(
        &self,
        kind: LastEmitted,
        action: ScaleAction,
        count: usize,
        depth: usize,
    ) -> Option<ScaleEvent> {
        {
            let mut last = self.last_emitted.lock();
            if *last == kind {
                return None;
            }
            *last = kind;
        }
        let event = ScaleEvent::new(action, count, depth);
        if let Err(e) = self.bus.publish_json(SCALE_TOPIC, &event).await {
            tracing::warn!(error = %e, "failed to publish scale event");
        }
        self.metrics.scale_events_total.inc();
        Some(event)
    }

    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.config.check_interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.tick().await;
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        tracing::info!("scaling publisher shutting down");
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
    use objectvault_domain::value_objects::OperationKind;

    use super::super::super::scheduler::SchedulerPolicy;

    fn publisher(queue: Arc<RequestQueue>) -> ScalingPublisher {
        let bus = Arc::new(MessageBus::connect("127.0.0.1", 1, "test-scaling-publisher"));
        ScalingPublisher::new(
            queue,
            bus,
            Arc::new(Metrics::new()),
            ScalingPublisherConfig {
                check_interval: Duration::from_secs(10),
                high_watermark: 5,
                low_watermark: 2,
                max_backends: 4,
                min_backends: 1,
            },
        )
    }

    #[tokio::test]
    async fn high_depth_emits_up_once() {
        let queue = Arc::new(RequestQueue::new(0.01, SchedulerPolicy::Sjn));
        for _ in 0..10 {
            queue.enqueue(objectvault_domain::entities::Request::new(OperationKind::Upload, 1));
        }
        let pub_ = publisher(queue);
        let first = pub_.tick().await;
        assert_eq!(first.unwrap().action, ScaleAction::Up);
        let second = pub_.tick().await;
        assert!(second.is_none(), "debounced: must not re-emit the same action");
    }
}
