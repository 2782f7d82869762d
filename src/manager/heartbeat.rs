// ABOUTME: Periodic background refresh of the manager's state.
// ABOUTME: Holds only a weak reference so a dropped manager ends the task.

use super::ContainerManager;
use std::sync::Weak;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

/// Default interval between refreshes.
pub const DEFAULT_HEARTBEAT: Duration = Duration::from_secs(5);

/// Handle to a running heartbeat task. Dropping it aborts the task.
pub struct Heartbeat {
    stop: watch::Sender<bool>,
    handle: Option<JoinHandle<()>>,
}

impl Heartbeat {
    pub(crate) fn spawn(manager: Weak<ContainerManager>, period: Duration) -> Self {
        let (stop, mut stopped) = watch::channel(false);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let Some(manager) = manager.upgrade() else {
                            break;
                        };
                        manager.refresh().await;
                    }
                    _ = stopped.changed() => break,
                }
            }
            debug!("heartbeat stopped");
        });

        Self {
            stop,
            handle: Some(handle),
        }
    }

    /// Stop after any refresh in flight completes.
    pub async fn stop(mut self) {
        let _ = self.stop.send(true);
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for Heartbeat {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
