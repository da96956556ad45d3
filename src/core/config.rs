//! Configuration for the Zoom reset

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ResetError, ResetResult};

/// Application name for directory paths
const APP_NAME: &str = "zoom-reset";

/// Persistent reset configuration, optionally read from TOML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResetConfig {
    /// Where timestamped backups go (default: ~/.zoom-reset-backups)
    pub backup_root: Option<PathBuf>,

    /// Never terminate running processes
    pub skip_kill: bool,

    /// Substring identifying Zoom processes (case-insensitive)
    pub process_pattern: String,

    /// Seconds to wait for terminated processes to exit before moving state
    pub exit_timeout_secs: u64,

    /// Additional locations to back up after the built-in ones.
    /// Absolute, or starting with `~/` for the home directory.
    pub extra_paths: Vec<PathBuf>,

    /// Built-in locations to leave alone (same form as `extra_paths`)
    pub excluded_paths: Vec<PathBuf>,
}

impl Default for ResetConfig {
    fn default() -> Self {
        Self {
            backup_root: None,
            skip_kill: false,
            process_pattern: "zoom".into(),
            exit_timeout_secs: 5,
            extra_paths: Vec::new(),
            excluded_paths: Vec::new(),
        }
    }
}

impl ResetConfig {
    /// Default config file location
    /// - Windows: %APPDATA%\zoom-reset\config.toml
    /// - macOS: ~/Library/Application Support/zoom-reset/config.toml
    /// - Linux: $XDG_CONFIG_HOME/zoom-reset/config.toml
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_NAME).join("config.toml"))
    }

    /// Load config from TOML file
    pub fn load(path: &Path) -> ResetResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| config_error(path, e))?;
        toml::from_str(&content).map_err(|e| config_error(path, e))
    }

    /// Load the default config file, or defaults when it does not exist
    pub fn load_or_default() -> ResetResult<Self> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Save config to TOML file
    pub fn save(&self, path: &Path) -> ResetResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| config_error(path, e))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ResetError::io(parent, e))?;
        }
        std::fs::write(path, content).map_err(|e| ResetError::io(path, e))
    }
}

fn config_error(path: &Path, err: impl std::fmt::Display) -> ResetError {
    ResetError::Config {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ResetConfig::default();
        assert_eq!(config.process_pattern, "zoom");
        assert!(!config.skip_kill);
        assert!(config.backup_root.is_none());
        assert_eq!(config.exit_timeout_secs, 5);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = ResetConfig {
            backup_root: Some(dir.path().join("backups")),
            skip_kill: true,
            extra_paths: vec![dir.path().join("extra")],
            ..Default::default()
        };
        config.save(&path).unwrap();

        assert_eq!(ResetConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "skip_kill = true\n").unwrap();

        let config = ResetConfig::load(&path).unwrap();
        assert!(config.skip_kill);
        assert_eq!(config.process_pattern, "zoom");
    }

    #[test]
    fn test_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "skip_kill = \"maybe\"").unwrap();

        let err = ResetConfig::load(&path).unwrap_err();
        assert!(matches!(err, ResetError::Config { .. }));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = ResetConfig::load(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ResetError::Config { .. }));
    }
}
