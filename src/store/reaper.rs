//! Periodic expiry of idle message groups

use crate::core::shutdown::ShutdownCoordinator;
use crate::store::{MessageGroupStore, StoreResult};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Default pause between expiry passes
pub const DEFAULT_REAPER_INTERVAL: Duration = Duration::from_secs(1);

/// Runs [`MessageGroupStore::expire_message_groups`] on a schedule
///
/// Each pass runs on tokio's blocking pool because expiry may complete
/// groups through a processor doing synchronous I/O.
///
/// # Example
///
/// ```rust,no_run
/// use correlate::core::shutdown::ShutdownCoordinator;
/// use correlate::store::{MessageGroupStoreReaper, SimpleMessageStore};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// # async fn example() {
/// let store = Arc::new(SimpleMessageStore::new());
/// let shutdown = ShutdownCoordinator::new();
/// let reaper = MessageGroupStoreReaper::new(store, Duration::from_secs(30))
///     .with_interval(Duration::from_secs(5))
///     .expire_on_stop(true)
///     .spawn(shutdown.clone());
///
/// // ... handle messages ...
///
/// let expired = reaper.stop().await;
/// println!("{} groups expired", expired);
/// # }
/// ```
pub struct MessageGroupStoreReaper {
    store: Arc<dyn MessageGroupStore>,
    timeout: Duration,
    interval: Duration,
    expire_on_stop: bool,
}

impl MessageGroupStoreReaper {
    pub fn new(store: Arc<dyn MessageGroupStore>, timeout: Duration) -> Self {
        Self {
            store,
            timeout,
            interval: DEFAULT_REAPER_INTERVAL,
            expire_on_stop: false,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Run one last pass when the reaper is stopped
    pub fn expire_on_stop(mut self, expire_on_stop: bool) -> Self {
        self.expire_on_stop = expire_on_stop;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run a single expiry pass on the calling thread
    pub fn run_once(&self) -> StoreResult<usize> {
        let expired = self.store.expire_message_groups(self.timeout)?;
        if expired > 0 {
            log::info!("Reaper expired {} message group(s)", expired);
        }
        Ok(expired)
    }

    /// Start periodic expiry until `shutdown` is triggered
    pub fn spawn(self, shutdown: ShutdownCoordinator) -> ReaperHandle {
        let mut shutdown_rx = shutdown.subscribe();
        let reaper = Arc::new(self);
        let coordinator = shutdown.clone();

        let task = tokio::spawn(async move {
            // tokio rejects a zero period
            let period = reaper.interval.max(Duration::from_millis(1));
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately
            ticker.tick().await;

            let mut total = 0;
            while !coordinator.is_shutdown_requested() {
                tokio::select! {
                    _ = shutdown_rx.recv() => break,
                    _ = ticker.tick() => total += run_pass(&reaper).await,
                }
            }

            if reaper.expire_on_stop {
                log::debug!("Reaper stopping; running final expiry pass");
                total += run_pass(&reaper).await;
            }
            total
        });

        ReaperHandle { shutdown, task }
    }
}

async fn run_pass(reaper: &Arc<MessageGroupStoreReaper>) -> usize {
    let reaper = Arc::clone(reaper);
    match tokio::task::spawn_blocking(move || reaper.run_once()).await {
        Ok(Ok(expired)) => expired,
        Ok(Err(e)) => {
            log::error!("Message group expiry failed: {}", e);
            0
        }
        Err(e) => {
            log::error!("Message group expiry task failed: {}", e);
            0
        }
    }
}

/// Handle to a running reaper
pub struct ReaperHandle {
    shutdown: ShutdownCoordinator,
    task: JoinHandle<usize>,
}

impl ReaperHandle {
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop the reaper and wait for it
    ///
    /// Triggers the shared shutdown coordinator. Returns the number of groups
    /// expired over the reaper's lifetime.
    pub async fn stop(self) -> usize {
        self.shutdown.trigger_shutdown();
        match self.task.await {
            Ok(total) => total,
            Err(e) => {
                log::error!("Reaper task failed: {}", e);
                0
            }
        }
    }
}
