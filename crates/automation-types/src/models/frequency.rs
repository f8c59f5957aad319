//! Frequency constraint definitions.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ConstraintError;

/// "At most `count` occurrences within any sliding `range`."
///
/// Constraints are identified by `identifier`; registering a constraint with an
/// existing identifier replaces the previous definition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrequencyConstraint {
    /// Unique constraint identifier
    #[serde(rename = "id")]
    pub identifier: String,
    /// Sliding window length
    #[serde(rename = "range_ms", with = "super::serde_duration")]
    pub range: Duration,
    /// Maximum occurrences within the window
    #[serde(rename = "boundary")]
    pub count: u32,
}

impl FrequencyConstraint {
    pub fn new(identifier: impl Into<String>, range: Duration, count: u32) -> Self {
        Self { identifier: identifier.into(), range, count }
    }

    pub fn builder() -> FrequencyConstraintBuilder {
        FrequencyConstraintBuilder::default()
    }

    /// Window length in whole milliseconds, saturating.
    pub fn range_millis(&self) -> i64 {
        i64::try_from(self.range.as_millis()).unwrap_or(i64::MAX)
    }

    pub fn validate(&self) -> Result<(), ConstraintError> {
        if self.identifier.is_empty() {
            return Err(ConstraintError::EmptyIdentifier);
        }
        if self.count == 0 {
            return Err(ConstraintError::InvalidCount {
                id: self.identifier.clone(),
                count: self.count,
            });
        }
        if self.range.is_zero() {
            return Err(ConstraintError::InvalidRange { id: self.identifier.clone() });
        }
        Ok(())
    }
}

/// Builder for [`FrequencyConstraint`]; `build` validates.
#[derive(Debug, Default, Clone)]
pub struct FrequencyConstraintBuilder {
    identifier: Option<String>,
    range: Duration,
    count: u32,
}

impl FrequencyConstraintBuilder {
    pub fn id(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    pub fn range(mut self, range: Duration) -> Self {
        self.range = range;
        self
    }

    pub fn count(mut self, count: u32) -> Self {
        self.count = count;
        self
    }

    pub fn build(self) -> Result<FrequencyConstraint, ConstraintError> {
        let constraint = FrequencyConstraint {
            identifier: self.identifier.unwrap_or_default(),
            range: self.range,
            count: self.count,
        };
        constraint.validate()?;
        Ok(constraint)
    }
}
