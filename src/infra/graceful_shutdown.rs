//! Graceful shutdown handling
//!
//! Waits for SIGINT/SIGTERM, lets axum drain in-flight requests, then runs
//! registered hooks (closing the ledger session).

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tokio::signal;
use tokio::sync::Mutex;
use tracing::{error, info};

type Hook = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Async cleanup steps run once the server has stopped accepting requests.
#[derive(Default)]
pub struct ShutdownHooks {
    hooks: Mutex<Vec<Hook>>,
}

impl ShutdownHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register<F>(&self, hook: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.hooks.lock().await.push(Box::pin(hook));
    }

    /// Run every hook in registration order, each bounded by `timeout`.
    pub async fn run(&self, timeout: Duration) {
        let hooks: Vec<Hook> = self.hooks.lock().await.drain(..).collect();
        for hook in hooks {
            if tokio::time::timeout(timeout, hook).await.is_err() {
                error!(?timeout, "Shutdown hook timed out");
            }
        }
    }
}

/// Completes on Ctrl+C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
