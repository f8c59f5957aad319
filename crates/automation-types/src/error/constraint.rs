//! Frequency constraint definition errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised when a frequency constraint definition is unusable.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "details")]
pub enum ConstraintError {
    /// Identifier is empty
    #[error("Constraint identifier must not be empty")]
    EmptyIdentifier,

    /// Count below one can never be satisfied
    #[error("Constraint {id} has invalid count {count} (must be >= 1)")]
    InvalidCount {
        /// Constraint identifier
        id: String,
        /// Offending count
        count: u32,
    },

    /// Zero-length window
    #[error("Constraint {id} has an empty range")]
    InvalidRange {
        /// Constraint identifier
        id: String,
    },

    /// Same identifier registered twice in one update
    #[error("Constraint {id} is defined more than once")]
    Duplicate {
        /// Constraint identifier
        id: String,
    },
}
