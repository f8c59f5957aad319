use std::fs;
use std::path::{Path, PathBuf};
use validator::Validate;

use automation_types::{AutomationConfig, ConfigError};

use crate::utils::paths::get_data_dir;

const CONFIG_FILE: &str = "automation_config.json";

/// `<data dir>/automation_config.json`
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    Ok(get_data_dir()?.join(CONFIG_FILE))
}

/// Load configuration from `path`.
///
/// A missing file yields the defaults. Unknown fields are ignored and missing
/// ones take their defaults, so older files keep loading.
pub fn load_config(path: &Path) -> Result<AutomationConfig, ConfigError> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "No config file, using defaults");
        return Ok(AutomationConfig::new());
    }

    let content = fs::read_to_string(path).map_err(|e| ConfigError::ParseError {
        message: format!("failed to read {}: {e}", path.display()),
    })?;
    let config: AutomationConfig =
        serde_json::from_str(&content).map_err(|e| ConfigError::from_json_error(&e))?;
    config.validate().map_err(|e| ConfigError::from_validation(&e))?;

    tracing::info!(path = %path.display(), "Loaded automation config");
    Ok(config)
}

/// Validate and write `config` as pretty JSON, creating parent directories.
pub fn save_config(path: &Path, config: &AutomationConfig) -> Result<(), ConfigError> {
    config.validate().map_err(|e| ConfigError::from_validation(&e))?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| ConfigError::from_io_error(&e))?;
    }
    let content =
        serde_json::to_string_pretty(config).map_err(|e| ConfigError::from_json_error(&e))?;
    fs::write(path, content).map_err(|e| ConfigError::from_io_error(&e))?;

    tracing::info!(path = %path.display(), "Saved automation config");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use automation_types::{AdditionalAudienceCheckConfig, Platform};

    #[test]
    fn test_missing_file_returns_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(&dir.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(config, AutomationConfig::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE);

        let mut config = AutomationConfig::new();
        config.platform = Platform::Amazon;
        config.display_interval_ms = 5_000;
        config.additional_audience_check = Some(AdditionalAudienceCheckConfig {
            is_enabled: true,
            context: Some(serde_json::json!({"segment": "beta"})),
            url: Some("https://example.com/audience".to_string()),
        });

        save_config(&path, &config).unwrap();
        assert_eq!(load_config(&path).unwrap(), config);
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "{ not json").unwrap();

        assert!(matches!(load_config(&path), Err(ConfigError::ParseError { .. })));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, r#"{"display_interval_ms": 999999999999}"#).unwrap();

        match load_config(&path) {
            Err(ConfigError::ValidationError { field, .. }) => {
                assert_eq!(field, "display_interval_ms");
            },
            other => panic!("expected validation error, got {other:?}"),
        }
    }
}
