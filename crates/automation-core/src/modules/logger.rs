//! Logging bootstrap.
//!
//! Installs the global `tracing` subscriber: an `EnvFilter` (`RUST_LOG` wins
//! over the configured level), a stdout fmt layer, an optional daily rolling
//! file, and the `log` -> `tracing` bridge.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

use automation_types::{ConfigError, LogConfig};

use crate::error::{AppError, AppResult};

const LOG_FILE_PREFIX: &str = "automation.log";

/// Build the filter from `RUST_LOG`, falling back to `config.level`.
pub fn build_filter(config: &LogConfig) -> Result<EnvFilter, ConfigError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(&config.level).map_err(|e| ConfigError::ValidationError {
        field: "log.level".to_string(),
        message: e.to_string(),
    })
}

/// Install the global subscriber.
///
/// Returns the file writer guard when file logging is enabled; keep it alive
/// for the lifetime of the process or buffered lines are lost.
pub fn init_logging(config: &LogConfig) -> AppResult<Option<WorkerGuard>> {
    let filter = build_filter(config)?;

    let (file_layer, guard) = match config.file_dir.as_deref() {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_writer(writer).with_ansi(false)), Some(guard))
        },
        None => (None, None),
    };

    let subscriber = Registry::default()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .with(file_layer);
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| AppError::Unknown(format!("failed to install subscriber: {e}")))?;

    if let Err(e) = tracing_log::LogTracer::init() {
        tracing::warn!(error = %e, "log bridge already installed");
    }

    tracing::info!(
        level = %config.level,
        file_dir = config.file_dir.as_deref().unwrap_or("-"),
        "Logging initialized"
    );
    Ok(guard)
}
