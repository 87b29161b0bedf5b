// Application state module
// Shared by every connection on both listeners

use std::path::PathBuf;
use std::sync::Arc;

use super::types::{Config, FilesUpdate};
use super::{validate_buffer_size, validate_root_dir, ConfigError};
use crate::fileserver::{DeliverySettings, FileServer};

/// Application state
pub struct AppState {
    pub config: Config,
    pub files: FileServer,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        let settings = Arc::new(DeliverySettings::new(config.files.buffer_size));
        Self {
            config: config.clone(),
            files: FileServer::with_settings(&config.files.root_dir, settings),
        }
    }

    pub const fn access_log_enabled(&self) -> bool {
        self.config.logging.access_log
    }

    /// Current runtime file settings
    pub fn files_snapshot(&self) -> FilesUpdate {
        FilesUpdate {
            root_dir: Some(self.files.root_dir().display().to_string()),
            buffer_size: Some(self.files.buffer_size()),
        }
    }

    /// Validate every field of `update` before applying any of them
    pub fn apply_files_update(&self, update: &FilesUpdate) -> Result<(), ConfigError> {
        if let Some(size) = update.buffer_size {
            validate_buffer_size(size)?;
        }
        if let Some(root) = &update.root_dir {
            validate_root_dir(root)?;
        }

        if let Some(size) = update.buffer_size {
            self.files.set_buffer_size(size);
        }
        if let Some(root) = &update.root_dir {
            self.files.set_root_dir(PathBuf::from(root));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn state() -> AppState {
        AppState::new(&Config::load_from("nonexistent-config-file").unwrap())
    }

    #[test]
    fn test_initial_snapshot() {
        let state = state();
        let snapshot = state.files_snapshot();
        assert_eq!(snapshot.root_dir.as_deref(), Some("public"));
        assert_eq!(snapshot.buffer_size, Some(32_768));
        assert!(state.access_log_enabled());
    }

    #[test]
    fn test_access_log_follows_config() {
        let mut config = Config::load_from("nonexistent-config-file").unwrap();
        config.logging.access_log = false;
        assert!(!AppState::new(&config).access_log_enabled());
    }

    #[test]
    fn test_apply_update() {
        let state = state();
        let dir = TempDir::new().unwrap();
        let root = dir.path().to_str().unwrap().to_string();

        state
            .apply_files_update(&FilesUpdate {
                root_dir: Some(root.clone()),
                buffer_size: Some(4096),
            })
            .unwrap();

        assert_eq!(state.files.buffer_size(), 4096);
        assert_eq!(state.files_snapshot().root_dir, Some(root));
    }

    #[test]
    fn test_invalid_update_applies_nothing() {
        let state = state();
        let result = state.apply_files_update(&FilesUpdate {
            root_dir: Some("/definitely/not/here".to_string()),
            buffer_size: Some(4096),
        });

        assert!(matches!(result, Err(ConfigError::RootDir(_))));
        assert_eq!(state.files.buffer_size(), 32_768);
    }

    #[test]
    fn test_zero_buffer_rejected() {
        let state = state();
        let result = state.apply_files_update(&FilesUpdate {
            root_dir: None,
            buffer_size: Some(0),
        });
        assert!(matches!(result, Err(ConfigError::BufferSize(0))));
    }
}
