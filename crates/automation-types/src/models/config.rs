//! Runtime configuration.

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::audience::AdditionalAudienceCheckConfig;

/// Device family reported to the audience check endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    #[default]
    Android,
    Amazon,
}

impl Platform {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Android => "android",
            Self::Amazon => "amazon",
        }
    }
}

/// Where persistent state lives.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Validate)]
pub struct StorageConfig {
    /// Override for the data directory (defaults to the platform data dir)
    #[serde(default)]
    pub data_dir: Option<String>,
    /// Keep state on disk; `false` uses in-memory SQLite
    #[serde(default = "default_true")]
    pub persistent: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { data_dir: None, persistent: true }
    }
}

/// Logging setup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Validate)]
pub struct LogConfig {
    /// Default filter directive; `RUST_LOG` wins when set
    #[validate(length(min = 1))]
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Directory for daily rolling log files
    #[serde(default)]
    pub file_dir: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { level: default_log_level(), file_dir: None }
    }
}

/// Full runtime configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
pub struct AutomationConfig {
    /// Cool-down between two default-behavior displays
    #[validate(range(max = 86_400_000_u64))]
    #[serde(default = "default_display_interval_ms")]
    pub display_interval_ms: u64,
    /// Platform reported as the device family
    #[serde(default)]
    pub platform: Platform,
    /// Host application version (cache entries are bound to it)
    #[validate(length(min = 1))]
    #[serde(default = "default_version")]
    pub app_version: String,
    /// Library version (cache entries are bound to it)
    #[validate(length(min = 1))]
    #[serde(default = "default_sdk_version")]
    pub sdk_version: String,
    /// Additional audience check settings, absent when not configured remotely
    #[serde(default)]
    pub additional_audience_check: Option<AdditionalAudienceCheckConfig>,
    #[validate(nested)]
    #[serde(default)]
    pub storage: StorageConfig,
    #[validate(nested)]
    #[serde(default)]
    pub log: LogConfig,
}

impl AutomationConfig {
    pub fn new() -> Self {
        Self {
            display_interval_ms: default_display_interval_ms(),
            platform: Platform::default(),
            app_version: default_version(),
            sdk_version: default_sdk_version(),
            additional_audience_check: None,
            storage: StorageConfig::default(),
            log: LogConfig::default(),
        }
    }

    pub fn display_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.display_interval_ms)
    }
}

impl Default for AutomationConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn default_true() -> bool {
    true
}

fn default_display_interval_ms() -> u64 {
    30_000
}

fn default_version() -> String {
    "0.0.0".to_string()
}

fn default_sdk_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}
