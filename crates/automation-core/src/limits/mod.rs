//! Frequency limiting for automation schedules.
//!
//! A schedule names one or more constraints ("at most N within T"). Before it
//! executes, the orchestration layer asks [`FrequencyLimitManager`] for a
//! [`FrequencyChecker`] over those ids and calls
//! [`FrequencyChecker::check_and_increment`]. Occurrences are recorded in
//! memory immediately and persisted asynchronously through a serial writer.

mod checker;
mod manager;
mod state;
pub mod store;
mod writer;


pub use checker::FrequencyChecker;
pub use manager::FrequencyLimitManager;
pub use store::{ConstraintRecord, FrequencyLimitStore, OccurrenceRecord};
