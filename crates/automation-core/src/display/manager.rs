use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;

use automation_types::{AutomationConfig, MessageDisplayInfo};

use super::{DefaultDisplayCoordinator, DisplayCoordinator, ImmediateDisplayCoordinator};
use crate::foreground::ForegroundSignal;

/// Host hook that may supply its own coordinator for a message.
pub type CoordinatorOverride =
    Arc<dyn Fn(&MessageDisplayInfo) -> Option<Arc<dyn DisplayCoordinator>> + Send + Sync>;

/// Owns the shared coordinators and picks one per message.
pub struct DisplayCoordinatorManager {
    default_coordinator: Arc<DefaultDisplayCoordinator>,
    immediate_coordinator: Arc<ImmediateDisplayCoordinator>,
    override_hook: RwLock<Option<CoordinatorOverride>>,
}

impl std::fmt::Debug for DisplayCoordinatorManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DisplayCoordinatorManager")
            .field("default_coordinator", &self.default_coordinator)
            .field("immediate_coordinator", &self.immediate_coordinator)
            .field("has_override", &self.override_hook.read().is_some())
            .finish()
    }
}

impl DisplayCoordinatorManager {
    pub fn new(foreground: ForegroundSignal, display_interval: Duration) -> Self {
        Self {
            default_coordinator: Arc::new(DefaultDisplayCoordinator::new(
                foreground.clone(),
                display_interval,
            )),
            immediate_coordinator: Arc::new(ImmediateDisplayCoordinator::new(foreground)),
            override_hook: RwLock::new(None),
        }
    }

    pub fn from_config(config: &AutomationConfig, foreground: ForegroundSignal) -> Self {
        Self::new(foreground, config.display_interval())
    }

    pub fn default_coordinator(&self) -> Arc<DefaultDisplayCoordinator> {
        Arc::clone(&self.default_coordinator)
    }

    pub fn display_interval(&self) -> Duration {
        self.default_coordinator.display_interval()
    }

    pub fn set_display_interval(&self, interval: Duration) {
        self.default_coordinator.set_display_interval(interval);
    }

    pub fn set_override(&self, hook: Option<CoordinatorOverride>) {
        *self.override_hook.write() = hook;
    }

    /// Override hook first, then immediate for immediate or embedded
    /// messages, otherwise the shared default coordinator.
    pub fn coordinator_for(&self, info: &MessageDisplayInfo) -> Arc<dyn DisplayCoordinator> {
        let hook = self.override_hook.read().clone();
        if let Some(coordinator) = hook.and_then(|hook| hook(info)) {
            return coordinator;
        }

        if info.is_immediate() {
            Arc::clone(&self.immediate_coordinator) as Arc<dyn DisplayCoordinator>
        } else {
            Arc::clone(&self.default_coordinator) as Arc<dyn DisplayCoordinator>
        }
    }
}
