//! Graceful shutdown coordination
//!
//! Built on `tokio_util::sync::CancellationToken`: tokens are cheap to clone,
//! children are cancelled with their parent, and cancellation can be observed
//! without consuming the token.

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Owns the root cancellation token for the process
#[derive(Clone, Default)]
pub struct ShutdownController {
    token: CancellationToken,
}

impl ShutdownController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Controller cancelled on Ctrl+C, or SIGTERM on unix
    pub fn with_signals() -> Self {
        let controller = Self::new();
        let token = controller.token.clone();

        tokio::spawn(async move {
            wait_for_signal().await;
            token.cancel();
        });

        controller
    }

    /// Token cancelled with this controller, but cancellable on its own
    pub fn child_token(&self) -> CancellationToken {
        self.token.child_token()
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn shutdown(&self) {
        info!("Manual shutdown triggered");
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub async fn wait_for_shutdown(&self) {
        self.token.cancelled().await;
    }
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut term = match signal(SignalKind::terminate()) {
        Ok(term) => term,
        Err(e) => {
            warn!("Failed to listen for SIGTERM: {}", e);
            wait_for_ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = wait_for_ctrl_c() => {}
        _ = term.recv() => info!("Received SIGTERM, initiating graceful shutdown..."),
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    wait_for_ctrl_c().await;
}

async fn wait_for_ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, initiating graceful shutdown..."),
        Err(e) => {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

/// Root token cancelled on Ctrl+C or SIGTERM
pub fn shutdown_signal() -> CancellationToken {
    ShutdownController::with_signals().token()
}
