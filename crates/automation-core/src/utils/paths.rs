use std::fs;
use std::path::PathBuf;

use automation_types::ConfigError;

const DATA_DIR: &str = ".automation_core";

/// Environment override for the data directory.
pub const DATA_DIR_ENV: &str = "AUTOMATION_DATA_DIR";

/// Get data directory path.
///
/// Priority:
/// 1. `AUTOMATION_DATA_DIR` environment variable (containers, tests)
/// 2. `~/.automation_core`
///
/// The directory is created when missing.
pub fn get_data_dir() -> Result<PathBuf, ConfigError> {
    let data_dir = match std::env::var(DATA_DIR_ENV) {
        Ok(custom_dir) if !custom_dir.is_empty() => PathBuf::from(custom_dir),
        _ => {
            let home = dirs::home_dir().ok_or_else(|| ConfigError::NotFound {
                path: "home directory".to_string(),
            })?;
            home.join(DATA_DIR)
        },
    };

    ensure_dir(data_dir)
}

/// Uses `configured` when set, otherwise [`get_data_dir`].
pub fn resolve_data_dir(configured: Option<&str>) -> Result<PathBuf, ConfigError> {
    match configured {
        Some(dir) if !dir.is_empty() => ensure_dir(PathBuf::from(dir)),
        _ => get_data_dir(),
    }
}

fn ensure_dir(data_dir: PathBuf) -> Result<PathBuf, ConfigError> {
    if !data_dir.exists() {
        fs::create_dir_all(&data_dir).map_err(|e| ConfigError::from_io_error(&e))?;
    }
    Ok(data_dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configured_dir_is_created() {
        let root = tempfile::tempdir().unwrap();
        let nested = root.path().join("state").join("automation");
        let resolved = resolve_data_dir(nested.to_str()).unwrap();
        assert_eq!(resolved, nested);
        assert!(nested.is_dir());
    }
}
