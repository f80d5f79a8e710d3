// /////////////////////////////////////////////////////////////////////////////
// Object Vault
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Load balancer daemon: priority queue, health-aware node selection,
//! and elastic-scale signalling (§4.9-4.13, §6).

use std::sync::Arc;
use std::time::Duration;

use objectvault_bootstrap::{install_signal_handler, CommonArgs, ShutdownCoordinator};
use objectvault_core::application::lb_api::{self, LoadBalancerApiState};
use objectvault_core::infrastructure::bus::MessageBus;
use objectvault_core::infrastructure::config::{CommonConfig, LoadBalancerConfig};
use objectvault_core::infrastructure::lb::{LoadBalancerWorker, LoadBalancerWorkerConfig, ScalingPublisher, ScalingPublisherConfig};
use objectvault_core::infrastructure::metrics::Metrics;
use objectvault_core::infrastructure::queue::RequestQueue;
use objectvault_core::infrastructure::registry::{HealthProber, NodeRegistry, TcpLivenessCheck};
use objectvault_core::infrastructure::scheduler::SchedulerPolicy;
use objectvault_core::infrastructure::shutdown_bridge::watch_from_token;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CommonArgs::parse_args();
    objectvault_bootstrap::logger::init_tracing(args.log_level.as_deref().unwrap_or("info"));

    let common = CommonConfig::load()?;
    let lb = LoadBalancerConfig::load()?;

    let bus = Arc::new(MessageBus::connect(&common.mqtt_host, common.mqtt_port, "objectvault-loadbalancer"));
    let policy = SchedulerPolicy::parse(&lb.scheduler_policy)?;
    let queue = Arc::new(RequestQueue::new(lb.aging_coefficient, policy));
    let registry = Arc::new(NodeRegistry::new());
    let metrics = Arc::new(Metrics::new());

    let worker = Arc::new(LoadBalancerWorker::new(
        queue.clone(),
        registry.clone(),
        policy,
        LoadBalancerWorkerConfig {
            latency_min: Duration::from_millis(lb.latency_min_ms),
            latency_max: Duration::from_millis(lb.latency_max_ms),
            ..Default::default()
        },
    ));

    let prober = Arc::new(HealthProber::new(
        registry.clone(),
        Arc::new(TcpLivenessCheck::new(22, Duration::from_secs(5))),
        Duration::from_secs(lb.health_check_interval_secs),
        3,
    ));

    let publisher = Arc::new(ScalingPublisher::new(
        queue.clone(),
        bus.clone(),
        metrics.clone(),
        ScalingPublisherConfig {
            check_interval: Duration::from_secs(lb.scale_check_interval_secs),
            high_watermark: lb.queue_high_watermark,
            low_watermark: lb.queue_low_watermark,
            max_backends: lb.max_backends,
            min_backends: lb.min_backends,
        },
    ));

    let coordinator = ShutdownCoordinator::default();
    install_signal_handler(coordinator.clone()).await;

    {
        let worker = worker.clone();
        let shutdown = watch_from_token(coordinator.token());
        tokio::spawn(async move { worker.run(shutdown).await });
    }
    {
        let prober = prober.clone();
        let shutdown = watch_from_token(coordinator.token());
        tokio::spawn(async move { prober.run(shutdown).await });
    }
    {
        let publisher = publisher.clone();
        let shutdown = watch_from_token(coordinator.token());
        tokio::spawn(async move { publisher.run(shutdown).await });
    }

    let state = LoadBalancerApiState {
        queue,
        worker,
        metrics,
    };
    let app = lb_api::router(state);

    let addr = format!("0.0.0.0:{}", lb.http_port);
    tracing::info!(%addr, "load balancer listening");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let token = coordinator.token();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { token.cancelled().await })
        .await?;

    Ok(())
}
