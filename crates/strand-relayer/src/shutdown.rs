//! Graceful shutdown on SIGTERM/SIGINT.

use tokio::{
    signal::unix::{signal, SignalKind},
    sync::broadcast,
};
use tracing::{debug, error, info};

/// Listens for termination signals and notifies every subscribed component
pub struct Shutdown {
    tx_shutdown: broadcast::Sender<()>,
}

impl Default for Shutdown {
    fn default() -> Self {
        let (tx_shutdown, _) = broadcast::channel(1);
        Self { tx_shutdown }
    }
}

impl Shutdown {
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx_shutdown.subscribe()
    }

    pub async fn run(&self) -> Result<(), ()> {
        let (mut sigterm, mut sigint) =
            match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
                (Ok(sigterm), Ok(sigint)) => (sigterm, sigint),
                (Err(err), _) | (_, Err(err)) => {
                    error!("Failed to install signal handlers: {}", err);
                    return Err(());
                }
            };

        tokio::select! {
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down the relayer..."),
            _ = sigint.recv() => info!("Received SIGINT, shutting down the relayer..."),
        };

        self.notify();
        Ok(())
    }

    /// Broadcast the shutdown to every subscribed component
    fn notify(&self) {
        if self.tx_shutdown.send(()).is_err() {
            debug!("No component left to notify of the shutdown");
        }
    }
}
