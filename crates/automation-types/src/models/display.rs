//! Message display metadata used to pick a display coordinator.

use serde::{Deserialize, Serialize};

/// How a message competes with other messages for the screen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayBehavior {
    /// Displays as soon as the app is in the foreground
    Immediate,
    /// One message at a time, with a cool-down between displays.
    /// Unknown values land here.
    #[default]
    #[serde(other)]
    Default,
}

/// Where the message is rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessagePlacement {
    /// Rendered inside host-provided views
    Embedded,
    /// Full-screen, modal, banner and friends
    #[default]
    #[serde(other)]
    Overlay,
}

/// Subset of a message payload needed for display coordination.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageDisplayInfo {
    #[serde(default)]
    pub display_behavior: DisplayBehavior,
    #[serde(rename = "display_type", default)]
    pub placement: MessagePlacement,
}

impl MessageDisplayInfo {
    /// Embedded content is never gated by the display interval.
    pub fn is_immediate(&self) -> bool {
        self.placement == MessagePlacement::Embedded
            || self.display_behavior == DisplayBehavior::Immediate
    }
}
