//! # Automation Types
//!
//! Core types, configuration, and error definitions for the automation runtime.
//!
//! - **`error`** - Typed error hierarchy for configuration and constraint definitions
//! - **`models`** - Domain models (frequency constraints, audience checks, display behavior, config)
//!
//! ## Architecture Role
//!
//! `automation-types` sits at the bottom of the dependency graph:
//!
//! ```text
//!      automation-types (this crate)
//!               │
//!               ▼
//!       automation-core
//!               │
//!               ▼
//!   scheduling / orchestration layer
//! ```
//!
//! All types are designed to be:
//! - **Serializable** via serde for config files and cache payloads
//! - **Clone** for cheap sharing across async boundaries
//! - **PartialEq** for testing and comparison

pub mod error;
pub mod models;

// Re-export error types for convenience
pub use error::{ConfigError, ConstraintError, Result, TypedError};

// Re-export core model types
pub use models::{
    AdditionalAudienceCheckConfig, AudienceCheckOverrides, AutomationConfig, DisplayBehavior,
    FrequencyConstraint, FrequencyConstraintBuilder, LogConfig, MessageDisplayInfo,
    MessagePlacement, Platform, StableContactInfo, StorageConfig,
};
