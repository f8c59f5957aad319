//! # Automation Core
//!
//! Concurrency primitives that gate in-app automation execution.
//!
//! ## Architecture
//!
//! ```text
//! automation-core/src/
//! ├── clock.rs       # Wall + monotonic time, TestClock for deterministic tests
//! ├── foreground.rs  # App-foreground publisher / observers
//! ├── limits/        # Frequency constraint store, limit manager, checkers
//! ├── display/       # Display coordinators (default cool-down, immediate)
//! ├── cache/         # SQLite-backed TTL result cache
//! ├── audience/      # Additional audience check API client + resolver
//! ├── timer/         # Active (foreground-gated) and manual timers
//! ├── modules/       # Config loading and logging bootstrap
//! └── utils/         # Data directory resolution
//! ```
//!
//! Every component is an explicit instance; there is no process-global state.
//! The orchestration layer constructs them once and passes them by reference.

#![allow(
    clippy::significant_drop_tightening,
    reason = "Mutex guards span short critical sections by construction"
)]
#![allow(clippy::map_err_ignore, reason = "Error context is provided in the replacement message")]
#![allow(clippy::module_name_repetitions, reason = "Type names mirror their module for clarity")]
// Test-only lints: allow panic!, println!, etc. in test code
#![cfg_attr(
    test,
    allow(clippy::panic, clippy::print_stdout, clippy::unwrap_used, clippy::expect_used)
)]

pub mod audience;
pub mod cache;
pub mod clock;
pub mod display;
pub mod error;
pub mod foreground;
pub mod limits;
pub mod modules;
pub mod timer;
pub mod utils;

// Re-export commonly used types
pub use audience::{AdditionalAudienceCheckerResolver, DeviceInfoProvider};
pub use automation_types as types;
pub use cache::ResultCache;
pub use clock::{Clock, SystemClock, TestClock};
pub use display::{DisplayCoordinator, DisplayCoordinatorManager};
pub use error::{AppError, AppResult};
pub use foreground::{ForegroundMonitor, ForegroundSignal};
pub use limits::{FrequencyChecker, FrequencyLimitManager, FrequencyLimitStore};
pub use timer::{ActiveTimer, ManualTimer, Timer};
