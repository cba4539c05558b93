//! Signal handlers for one-shot and daemon modes

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use colored::Colorize;
use tokio::sync::mpsc;
use tracing::debug;

/// Interrupt flag for one-shot mode
pub struct ShutdownSignal {
    shutdown: Arc<AtomicBool>,
}

impl ShutdownSignal {
    /// Create a new shutdown signal handler
    pub fn new() -> Self {
        Self {
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Get a clone of the shutdown flag
    pub fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Check if shutdown was requested
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Setup signal handler for Ctrl+C
    pub fn setup(&self) {
        let shutdown = Arc::clone(&self.shutdown);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                debug!("Interrupt received");
                shutdown.store(true, Ordering::SeqCst);
            }
        });
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// OS signals the daemon reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaemonSignal {
    /// SIGINT
    Interrupt,
    /// SIGTERM
    Terminate,
}

/// Daemon signal handler
///
/// Forwards SIGINT and SIGTERM into a channel so the daemon loop can
/// shut the recorder down cleanly.
#[cfg(unix)]
pub struct DaemonSignalHandler {
    receiver: mpsc::Receiver<DaemonSignal>,
}

#[cfg(unix)]
impl DaemonSignalHandler {
    /// Start listening for shutdown signals
    pub fn new() -> Result<Self, std::io::Error> {
        use tokio::signal::unix::{signal, SignalKind};

        let (tx, rx) = mpsc::channel(4);

        let tx_int = tx.clone();
        let mut sigint = signal(SignalKind::interrupt())?;
        tokio::spawn(async move {
            while sigint.recv().await.is_some() {
                eprintln!("{} Received SIGINT (shutdown)", "↓".cyan());
                if tx_int.send(DaemonSignal::Interrupt).await.is_err() {
                    break;
                }
            }
        });

        let mut sigterm = signal(SignalKind::terminate())?;
        tokio::spawn(async move {
            while sigterm.recv().await.is_some() {
                eprintln!("{} Received SIGTERM (shutdown)", "↓".cyan());
                if tx.send(DaemonSignal::Terminate).await.is_err() {
                    break;
                }
            }
        });

        Ok(Self { receiver: rx })
    }

    /// Wait for the next signal
    pub async fn recv(&mut self) -> Option<DaemonSignal> {
        self.receiver.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shutdown_signal_default_is_false() {
        let signal = ShutdownSignal::new();
        assert!(!signal.is_shutdown());
    }

    #[test]
    fn shutdown_signal_flag_can_be_set() {
        let signal = ShutdownSignal::new();
        let flag = signal.flag();
        flag.store(true, Ordering::SeqCst);
        assert!(signal.is_shutdown());
    }

    #[test]
    fn daemon_signal_equality() {
        assert_eq!(DaemonSignal::Interrupt, DaemonSignal::Interrupt);
        assert_ne!(DaemonSignal::Interrupt, DaemonSignal::Terminate);
    }
}
