//! Signal handling for graceful shutdown
//!
//! A single `ShutdownSignal` is shared by the whole pipeline. The signal
//! listener flips it on CTRL-C or SIGTERM; the coordinator checks it between
//! items, the retry policy races it against backoff sleeps, and the downloader
//! checks it on every body chunk.

use tokio::signal;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Cloneable cancellation flag backed by a watch channel
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    tx: watch::Sender<bool>,
    rx: watch::Receiver<bool>,
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownSignal {
    /// Create an untriggered signal
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self { tx, rx }
    }

    /// Request shutdown; idempotent
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    /// Whether shutdown has been requested
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once shutdown has been requested
    pub async fn triggered(&self) {
        let mut rx = self.rx.clone();
        // An error means every sender is gone; we hold one, so it cannot happen
        let _ = rx.wait_for(|triggered| *triggered).await;
    }
}

/// Listens for process signals and triggers a `ShutdownSignal`
pub struct SignalHandler {
    shutdown: ShutdownSignal,
}

impl SignalHandler {
    /// Create a handler that will trigger the given signal
    pub fn new(shutdown: ShutdownSignal) -> Self {
        Self { shutdown }
    }

    /// Setup signal handling for graceful shutdown (CTRL-C, SIGTERM)
    ///
    /// Returns a handle to the background task that monitors for signals.
    pub fn setup(&self) -> JoinHandle<()> {
        let shutdown = self.shutdown.clone();

        tokio::spawn(async move {
            let ctrl_c = async {
                if let Err(e) = signal::ctrl_c().await {
                    warn!("Failed to install Ctrl+C handler: {}", e);
                    std::future::pending::<()>().await;
                }
            };

            #[cfg(unix)]
            let terminate = async {
                match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                    Ok(mut stream) => {
                        stream.recv().await;
                    }
                    Err(e) => {
                        warn!("Failed to install SIGTERM handler: {}", e);
                        std::future::pending::<()>().await;
                    }
                }
            };

            #[cfg(not(unix))]
            let terminate = std::future::pending::<()>();

            tokio::select! {
                _ = ctrl_c => {
                    info!("Received Ctrl+C, initiating shutdown");
                },
                _ = terminate => {
                    info!("Received terminate signal, initiating shutdown");
                },
            }

            shutdown.trigger();
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_signal_starts_untriggered() {
        let shutdown = ShutdownSignal::new();
        assert!(!shutdown.is_triggered());

        // Waiting on an untriggered signal must not resolve
        let result = timeout(Duration::from_millis(20), shutdown.triggered()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_trigger_is_seen_by_clones() {
        let shutdown = ShutdownSignal::new();
        let observer = shutdown.clone();

        tokio::spawn({
            let shutdown = shutdown.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(10)).await;
                shutdown.trigger();
            }
        });

        let result = timeout(Duration::from_millis(200), observer.triggered()).await;
        assert!(result.is_ok());
        assert!(observer.is_triggered());

        // Triggering twice is harmless
        shutdown.trigger();
        assert!(shutdown.is_triggered());
    }

    #[tokio::test]
    async fn test_signal_handler_setup() {
        let shutdown = ShutdownSignal::new();
        let handler = SignalHandler::new(shutdown.clone());

        // We can't easily deliver real signals in unit tests
        let handle = handler.setup();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!shutdown.is_triggered());
        handle.abort();
    }
}
