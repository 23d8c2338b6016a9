//! Engine configuration.

use std::path::{Path, PathBuf};

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

/// Name of the directory backups are kept in, under the system temp dir.
pub const DEFAULT_BACKUP_DIR_NAME: &str = "filebrowser-undo-backups";

/// Default number of undoable commands kept.
pub const DEFAULT_MAX_HISTORY: usize = 100;

/// Configuration for the undo/redo engine.
#[derive(Debug, Clone, PartialEq, Eq, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
#[serde(default)]
pub struct EngineConfig {
    /// Directory under which backup snapshots are stored.
    #[builder(default = "default_backup_root()")]
    pub backup_root: PathBuf,

    /// Maximum number of commands on the undo stack.
    #[builder(default = "DEFAULT_MAX_HISTORY")]
    pub max_history: usize,

    /// Ask for confirmation before deleting.
    #[builder(default = "true")]
    pub confirm_delete: bool,

    /// Remove this session's backups when the engine shuts down.
    #[builder(default = "true")]
    pub purge_on_exit: bool,
}

/// The default backup root: `<tmp>/filebrowser-undo-backups`.
pub fn default_backup_root() -> PathBuf {
    std::env::temp_dir().join(DEFAULT_BACKUP_DIR_NAME)
}

impl EngineConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(ref root) = self.backup_root {
            if root.as_os_str().is_empty() {
                return Err("Backup root cannot be empty".to_string());
            }
        }
        if let Some(max) = self.max_history {
            if max == 0 {
                return Err("History must keep at least one entry".to_string());
            }
        }
        Ok(())
    }
}

impl EngineConfig {
    /// Create a new config builder.
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    /// Create a default config that keeps backups under `backup_root`.
    pub fn new(backup_root: impl Into<PathBuf>) -> Self {
        Self {
            backup_root: backup_root.into(),
            ..Self::default()
        }
    }

    /// Get the config file path.
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("backtrack").join("config.toml"))
    }

    /// Load the config from the default location, or return defaults.
    pub fn load() -> Self {
        Self::config_path()
            .map(|path| Self::load_from(&path))
            .unwrap_or_default()
    }

    /// Load the config from `path`, falling back to defaults if it is
    /// missing or cannot be parsed.
    pub fn load_from(path: &Path) -> Self {
        std::fs::read_to_string(path)
            .ok()
            .and_then(|content| toml::from_str::<Self>(&content).ok())
            .map(Self::sanitized)
            .unwrap_or_default()
    }

    /// Render the config as TOML.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Save the config to `path`.
    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = self
            .to_toml()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        std::fs::write(path, content)
    }

    fn sanitized(mut self) -> Self {
        if self.max_history == 0 {
            self.max_history = DEFAULT_MAX_HISTORY;
        }
        if self.backup_root.as_os_str().is_empty() {
            self.backup_root = default_backup_root();
        }
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            backup_root: default_backup_root(),
            max_history: DEFAULT_MAX_HISTORY,
            confirm_delete: true,
            purge_on_exit: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = EngineConfig::builder()
            .backup_root("/var/tmp/undo")
            .max_history(5usize)
            .confirm_delete(false)
            .build()
            .unwrap();

        assert_eq!(config.backup_root, PathBuf::from("/var/tmp/undo"));
        assert_eq!(config.max_history, 5);
        assert!(!config.confirm_delete);
        assert!(config.purge_on_exit);
    }

    #[test]
    fn test_config_builder_rejects_zero_history() {
        let result = EngineConfig::builder().max_history(0usize).build();
        assert!(result.is_err());
    }

    #[test]
    fn test_default_backup_root() {
        let config = EngineConfig::default();
        assert!(config.backup_root.ends_with(DEFAULT_BACKUP_DIR_NAME));
        assert!(config.backup_root.starts_with(std::env::temp_dir()));
        assert_eq!(config.max_history, DEFAULT_MAX_HISTORY);
    }

    #[test]
    fn test_load_partial_and_invalid() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        std::fs::write(&path, "max_history = 3\nconfirm_delete = false\n").unwrap();
        let config = EngineConfig::load_from(&path);
        assert_eq!(config.max_history, 3);
        assert!(!config.confirm_delete);
        assert_eq!(config.backup_root, default_backup_root());

        std::fs::write(&path, "max_history = 0\n").unwrap();
        assert_eq!(EngineConfig::load_from(&path).max_history, DEFAULT_MAX_HISTORY);

        std::fs::write(&path, "this is not toml =").unwrap();
        assert_eq!(EngineConfig::load_from(&path), EngineConfig::default());

        assert_eq!(
            EngineConfig::load_from(&dir.path().join("missing.toml")),
            EngineConfig::default()
        );
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = EngineConfig::new(dir.path().join("backups"));

        config.save_to(&path).unwrap();
        assert_eq!(EngineConfig::load_from(&path), config);
    }
}
