// /////////////////////////////////////////////////////////////////////////////
// Object Vault
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Host controller daemon: reconciles the managed backend fleet against
//! scaling events published by the load balancer (§4.14, §6).

use std::sync::Arc;

use objectvault_bootstrap::{install_signal_handler, CommonArgs, ShutdownCoordinator};
use objectvault_core::infrastructure::bus::MessageBus;
use objectvault_core::infrastructure::config::CommonConfig;
use objectvault_core::infrastructure::host_controller::{HostController, HostControllerConfig, LocalCliExecutor};
use objectvault_core::infrastructure::registry::NodeRegistry;
use objectvault_core::infrastructure::shutdown_bridge::watch_from_token;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CommonArgs::parse_args();
    objectvault_bootstrap::logger::init_tracing(args.log_level.as_deref().unwrap_or("info"));

    let common = CommonConfig::load()?;

    let bus = Arc::new(MessageBus::connect(&common.mqtt_host, common.mqtt_port, "objectvault-hostcontroller"));
    let registry = Arc::new(NodeRegistry::new());
    let executor = Arc::new(LocalCliExecutor::default());
    let controller = Arc::new(HostController::new(executor, registry, bus, HostControllerConfig::default()));

    let coordinator = ShutdownCoordinator::default();
    install_signal_handler(coordinator.clone()).await;

    let shutdown = watch_from_token(coordinator.token());
    tracing::info!("host controller running");
    controller.run(shutdown).await;

    Ok(())
}
