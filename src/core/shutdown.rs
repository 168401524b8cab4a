//! Shutdown coordination
//!
//! One broadcast channel fans a shutdown request out to every long-running
//! task (the input loop and the group store reaper). Requests come from
//! process signals or from code calling [`ShutdownCoordinator::trigger_shutdown`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Coordinates graceful shutdown across tasks
#[derive(Clone)]
pub struct ShutdownCoordinator {
    shutdown_tx: broadcast::Sender<()>,
    shutdown_requested: Arc<AtomicBool>,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        let (shutdown_tx, _) = broadcast::channel(8);
        Self {
            shutdown_tx,
            shutdown_requested: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    pub fn trigger_shutdown(&self) {
        // Release pairs with the Acquire load in is_shutdown_requested
        self.shutdown_requested.store(true, Ordering::Release);
        let _ = self.shutdown_tx.send(());
    }

    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown_requested.load(Ordering::Acquire)
    }

    /// Route SIGINT/SIGTERM/SIGHUP (or Ctrl-C elsewhere) into this coordinator
    ///
    /// A second signal exits the process immediately with status 130.
    /// Must be called from within a tokio runtime.
    pub fn install_signal_handlers(&self) {
        #[cfg(unix)]
        {
            use std::sync::atomic::AtomicUsize;
            use tokio::signal::unix::{signal, SignalKind};

            // Restore default SIGPIPE so `correlate | head` terminates quietly
            unsafe {
                libc::signal(libc::SIGPIPE, libc::SIG_DFL);
            }

            let signal_count = Arc::new(AtomicUsize::new(0));
            for kind in [
                SignalKind::interrupt(),
                SignalKind::terminate(),
                SignalKind::hangup(),
            ] {
                let coordinator = self.clone();
                let signal_count = Arc::clone(&signal_count);
                tokio::spawn(async move {
                    let Ok(mut stream) = signal(kind) else {
                        log::warn!("Unable to install handler for signal {:?}", kind);
                        return;
                    };
                    while stream.recv().await.is_some() {
                        if signal_count.fetch_add(1, Ordering::AcqRel) >= 1 {
                            log::warn!("Second shutdown signal received; exiting");
                            std::process::exit(130);
                        }
                        log::info!("Shutdown signal received; finishing in-flight work");
                        coordinator.trigger_shutdown();
                    }
                });
            }
        }

        #[cfg(not(unix))]
        {
            let coordinator = self.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    coordinator.trigger_shutdown();
                }
            });
        }
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{timeout, Duration};

    #[tokio::test]
    async fn test_new_coordinator_is_not_shut_down() {
        let coordinator = ShutdownCoordinator::new();
        assert!(!coordinator.is_shutdown_requested());
    }

    #[tokio::test]
    async fn test_trigger_reaches_every_subscriber() {
        let coordinator = ShutdownCoordinator::new();
        let mut first = coordinator.subscribe();
        let mut second = coordinator.clone().subscribe();

        coordinator.trigger_shutdown();

        assert!(coordinator.is_shutdown_requested());
        assert!(timeout(Duration::from_millis(100), first.recv()).await.is_ok());
        assert!(timeout(Duration::from_millis(100), second.recv()).await.is_ok());
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let coordinator = ShutdownCoordinator::new();
        let clone = coordinator.clone();
        clone.trigger_shutdown();
        assert!(coordinator.is_shutdown_requested());
    }
}
