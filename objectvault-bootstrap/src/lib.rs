// /////////////////////////////////////////////////////////////////////////////
// Object Vault
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Bootstrap module shared by the three daemons.
//!
//! Sits outside the domain/application/infrastructure layers and owns the
//! concerns every binary needs before it can do anything domain-specific:
//! CLI parsing, tracing initialization, and coordinated graceful shutdown
//! on SIGINT/SIGTERM.

pub mod cli;
pub mod logger;
pub mod shutdown;

pub use cli::CommonArgs;
pub use shutdown::{CancellationToken, ShutdownCoordinator};

/// Installs a Ctrl-C / SIGTERM handler that initiates shutdown on the
/// given coordinator. Each binary calls this once from `main`.
pub async fn install_signal_handler(coordinator: ShutdownCoordinator) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = sigterm.recv() => {}
            }
            tracing::info!("shutdown signal received");
            coordinator.initiate_shutdown();
        });
    }
    #[cfg(not(unix))]
    {
        tokio::spawn(async move {
            let _ = tokio::signal::ctrl_c().await;
            coordinator.initiate_shutdown();
        });
    }
}
