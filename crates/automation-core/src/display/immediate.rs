use async_trait::async_trait;

use super::DisplayCoordinator;
use crate::foreground::ForegroundSignal;

/// Ready whenever the app is foregrounded. Lock calls are no-ops.
#[derive(Debug, Clone)]
pub struct ImmediateDisplayCoordinator {
    foreground: ForegroundSignal,
}

impl ImmediateDisplayCoordinator {
    pub fn new(foreground: ForegroundSignal) -> Self {
        Self { foreground }
    }
}

#[async_trait]
impl DisplayCoordinator for ImmediateDisplayCoordinator {
    fn is_ready(&self) -> bool {
        self.foreground.is_foreground()
    }

    fn message_will_display(&self) {}

    fn message_finished_displaying(&self) {}

    async fn wait_for_ready(&self) {
        if !self.foreground.wait_for_foreground().await {
            std::future::pending::<()>().await;
        }
    }
}
