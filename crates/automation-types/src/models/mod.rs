//! Domain models shared between the runtime and its consumers.

pub mod audience;
pub mod config;
pub mod display;
pub mod frequency;
mod serde_duration;

pub use audience::{AdditionalAudienceCheckConfig, AudienceCheckOverrides, StableContactInfo};
pub use config::{AutomationConfig, LogConfig, Platform, StorageConfig};
pub use display::{DisplayBehavior, MessageDisplayInfo, MessagePlacement};
pub use frequency::{FrequencyConstraint, FrequencyConstraintBuilder};
