//! Display coordination.
//!
//! A coordinator decides when the next message may take the screen. The
//! default coordinator allows one display at a time followed by a cool-down;
//! the immediate coordinator only waits for the app to be foregrounded.
//! [`DisplayCoordinatorManager`] picks one per message.

mod cooldown;
mod immediate;
mod manager;


use async_trait::async_trait;

pub use cooldown::{DefaultDisplayCoordinator, LockState};
pub use immediate::ImmediateDisplayCoordinator;
pub use manager::{CoordinatorOverride, DisplayCoordinatorManager};

#[async_trait]
pub trait DisplayCoordinator: Send + Sync + std::fmt::Debug {
    /// Whether a message may be displayed right now.
    fn is_ready(&self) -> bool;

    /// Called on the UI context right before a message is shown.
    fn message_will_display(&self);

    /// Called on the UI context once the message is dismissed.
    fn message_finished_displaying(&self);

    /// Resolves once [`DisplayCoordinator::is_ready`] is true. Cancel by dropping.
    async fn wait_for_ready(&self);
}
