//! Typed error definitions.
//!
//! Errors here are the ones that describe bad *input*: configuration files and
//! frequency constraint definitions. They are:
//!
//! - **Serializable** via serde
//! - **Displayable** for logging via Display trait
//! - **Matchable** for error handling logic via enum variants

mod config;
mod constraint;

pub use config::ConfigError;
pub use constraint::ConstraintError;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified error type that wraps all domain-specific input errors.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "domain", content = "error")]
pub enum TypedError {
    /// Wraps a configuration error
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Wraps a frequency constraint definition error
    #[error("Constraint error: {0}")]
    Constraint(#[from] ConstraintError),
}

/// Standard Result type using TypedError.
pub type Result<T> = std::result::Result<T, TypedError>;
