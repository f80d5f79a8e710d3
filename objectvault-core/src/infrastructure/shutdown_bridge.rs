//! Adapts a `ShutdownCoordinator`'s `CancellationToken` to the
//! `watch::Receiver<bool>` shape the background loops (health prober,
//! scaling publisher, LB worker, host controller) were written against.

use objectvault_bootstrap::shutdown::CancellationToken;
use tokio::sync::watch;

pub fn watch_from_token(token: CancellationToken) -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        token.cancelled().await;
        let _ = tx.send(true);
    });
    rx
}
