use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::DisplayCoordinator;
use crate::foreground::ForegroundSignal;

/// Lock state of [`DefaultDisplayCoordinator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    Unlocked,
    Locked,
    /// Finished displaying, waiting out the display interval
    Unlocking,
}

/// One message at a time, with `display_interval` between the end of one
/// display and the start of the next.
#[derive(Debug)]
pub struct DefaultDisplayCoordinator {
    lock_state: Arc<watch::Sender<LockState>>,
    foreground: ForegroundSignal,
    display_interval: Mutex<Duration>,
    unlock_task: Mutex<Option<JoinHandle<()>>>,
}

impl DefaultDisplayCoordinator {
    pub fn new(foreground: ForegroundSignal, display_interval: Duration) -> Self {
        let (lock_state, _) = watch::channel(LockState::Unlocked);
        Self {
            lock_state: Arc::new(lock_state),
            foreground,
            display_interval: Mutex::new(display_interval),
            unlock_task: Mutex::new(None),
        }
    }

    pub fn lock_state(&self) -> LockState {
        *self.lock_state.borrow()
    }

    pub fn display_interval(&self) -> Duration {
        *self.display_interval.lock()
    }

    /// Changes the cool-down. A cool-down already in progress restarts with
    /// the new interval.
    pub fn set_display_interval(&self, interval: Duration) {
        *self.display_interval.lock() = interval;

        let mut task = self.unlock_task.lock();
        if self.lock_state() == LockState::Unlocking {
            tracing::debug!(interval_ms = interval.as_millis() as u64, "Restarting display cool-down");
            self.schedule_unlock(&mut task, interval);
        }
    }

    fn schedule_unlock(&self, task: &mut Option<JoinHandle<()>>, interval: Duration) {
        if let Some(previous) = task.take() {
            previous.abort();
        }

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("No Tokio runtime, display coordinator stays locked");
            return;
        };

        let lock_state = Arc::clone(&self.lock_state);
        *task = Some(handle.spawn(async move {
            tokio::time::sleep(interval).await;
            let unlocked = lock_state.send_if_modified(|state| {
                if *state == LockState::Unlocking {
                    *state = LockState::Unlocked;
                    true
                } else {
                    false
                }
            });
            if unlocked {
                tracing::debug!("Display coordinator unlocked");
            }
        }));
    }
}

#[async_trait]
impl DisplayCoordinator for DefaultDisplayCoordinator {
    fn is_ready(&self) -> bool {
        self.lock_state() == LockState::Unlocked && self.foreground.is_foreground()
    }

    fn message_will_display(&self) {
        let mut task = self.unlock_task.lock();
        if let Some(pending) = task.take() {
            pending.abort();
        }
        let _ = self.lock_state.send_replace(LockState::Locked);
        tracing::debug!("Display coordinator locked");
    }

    fn message_finished_displaying(&self) {
        let mut task = self.unlock_task.lock();
        if self.lock_state() == LockState::Unlocked {
            return;
        }
        let _ = self.lock_state.send_replace(LockState::Unlocking);
        let interval = self.display_interval();
        self.schedule_unlock(&mut task, interval);
    }

    async fn wait_for_ready(&self) {
        let mut lock_rx = self.lock_state.subscribe();
        loop {
            let unlocked = lock_rx.wait_for(|state| *state == LockState::Unlocked).await.is_ok();
            if !unlocked || !self.foreground.wait_for_foreground().await {
                // Foreground source is gone: never ready.
                std::future::pending::<()>().await;
            }
            if self.is_ready() {
                return;
            }
        }
    }
}

impl Drop for DefaultDisplayCoordinator {
    fn drop(&mut self) {
        if let Some(task) = self.unlock_task.get_mut().take() {
            task.abort();
        }
    }
}
