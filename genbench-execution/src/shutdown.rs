//! Operator interrupt coordination
//!
//! The first signal wins and is remembered, so listeners created after the
//! signal fired still observe it.

use std::fmt;
use std::sync::{Arc, OnceLock};
use tokio::sync::broadcast;
use tracing::{info, warn};

/// Why the benchmark is stopping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    /// Ctrl+C / SIGINT
    Interrupt,
    /// SIGTERM
    Terminate,
}

impl fmt::Display for ShutdownSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownSignal::Interrupt => write!(f, "interrupt"),
            ShutdownSignal::Terminate => write!(f, "terminate"),
        }
    }
}

/// Broadcasts a single shutdown signal to every listener
#[derive(Clone)]
pub struct ShutdownCoordinator {
    sender: broadcast::Sender<ShutdownSignal>,
    fired: Arc<OnceLock<ShutdownSignal>>,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(4);
        Self {
            sender,
            fired: Arc::new(OnceLock::new()),
        }
    }

    /// Subscribe to shutdown signals
    pub fn subscribe(&self) -> ShutdownListener {
        ShutdownListener {
            receiver: self.sender.subscribe(),
            fired: Arc::clone(&self.fired),
        }
    }

    /// Fire the shutdown signal. Later calls are ignored.
    pub fn trigger(&self, signal: ShutdownSignal) {
        if self.fired.set(signal).is_ok() {
            info!("Shutdown requested ({})", signal);
            // No receivers is fine: the flag is already set
            let _ = self.sender.send(signal);
        }
    }

    pub fn signal(&self) -> Option<ShutdownSignal> {
        self.fired.get().copied()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.fired.get().is_some()
    }

    /// Forward Ctrl+C (and SIGTERM on unix) into this coordinator
    pub fn listen_for_os_signals(&self) -> tokio::task::JoinHandle<()> {
        let coordinator = self.clone();
        tokio::spawn(async move {
            let signal = wait_for_os_signal().await;
            coordinator.trigger(signal);
        })
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving side of a [`ShutdownCoordinator`]
pub struct ShutdownListener {
    receiver: broadcast::Receiver<ShutdownSignal>,
    fired: Arc<OnceLock<ShutdownSignal>>,
}

impl ShutdownListener {
    /// Resolve once shutdown has been requested; never resolves otherwise
    pub async fn wait(&mut self) -> ShutdownSignal {
        if let Some(signal) = self.fired.get() {
            return *signal;
        }
        loop {
            match self.receiver.recv().await {
                Ok(signal) => return signal,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => {
                    if let Some(signal) = self.fired.get() {
                        return *signal;
                    }
                    std::future::pending::<()>().await;
                }
            }
        }
    }
}

#[cfg(unix)]
async fn wait_for_os_signal() -> ShutdownSignal {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut terminate) => tokio::select! {
            _ = tokio::signal::ctrl_c() => ShutdownSignal::Interrupt,
            _ = terminate.recv() => ShutdownSignal::Terminate,
        },
        Err(e) => {
            warn!("SIGTERM handler unavailable: {}", e);
            ctrl_c_or_pending().await
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_os_signal() -> ShutdownSignal {
    ctrl_c_or_pending().await
}

async fn ctrl_c_or_pending() -> ShutdownSignal {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Ctrl+C handler unavailable: {}", e);
        std::future::pending::<()>().await;
    }
    ShutdownSignal::Interrupt
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_listener_receives_signal() {
        let coordinator = ShutdownCoordinator::new();
        let mut listener = coordinator.subscribe();

        let trigger = coordinator.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.trigger(ShutdownSignal::Interrupt);
        });

        let signal = tokio::time::timeout(Duration::from_secs(5), listener.wait())
            .await
            .unwrap();
        assert_eq!(signal, ShutdownSignal::Interrupt);
    }

    #[tokio::test]
    async fn test_late_listener_sees_earlier_signal() {
        let coordinator = ShutdownCoordinator::new();
        coordinator.trigger(ShutdownSignal::Terminate);
        coordinator.trigger(ShutdownSignal::Interrupt);

        let mut listener = coordinator.subscribe();
        assert_eq!(listener.wait().await, ShutdownSignal::Terminate);
        assert_eq!(coordinator.signal(), Some(ShutdownSignal::Terminate));
        assert!(coordinator.is_shutting_down());
    }

    #[tokio::test]
    async fn test_listener_pends_without_signal() {
        let coordinator = ShutdownCoordinator::new();
        let mut listener = coordinator.subscribe();
        let waited = tokio::time::timeout(Duration::from_millis(20), listener.wait()).await;
        assert!(waited.is_err());
    }
}
