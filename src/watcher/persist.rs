//! Writing the watch directory list back to project settings.

use async_trait::async_trait;
use std::path::PathBuf;

use crate::config::Settings;

use super::error::WatchError;

/// Persists the set of watched directories across sessions.
#[async_trait]
pub trait WatchPersistence: Send + Sync {
    async fn save_watch_directories(&self, directories: &[PathBuf]) -> Result<(), WatchError>;
}

/// Stores the list in the project settings file, leaving every other
/// setting in the file untouched.
pub struct SettingsPersistence {
    settings_path: PathBuf,
}

impl SettingsPersistence {
    pub fn new(settings_path: impl Into<PathBuf>) -> Self {
        Self {
            settings_path: settings_path.into(),
        }
    }
}

#[async_trait]
impl WatchPersistence for SettingsPersistence {
    async fn save_watch_directories(&self, directories: &[PathBuf]) -> Result<(), WatchError> {
        let path = self.settings_path.clone();
        let directories = directories.to_vec();

        // Settings IO is synchronous; hop off the async runtime for it.
        tokio::task::spawn_blocking(move || {
            let mut settings = Settings::load_from(&path).map_err(|e| WatchError::Persist {
                reason: e.to_string(),
            })?;
            settings.compiler.watch_directories = directories;
            settings.save(&path).map_err(|e| WatchError::Persist {
                reason: e.to_string(),
            })
        })
        .await
        .map_err(|e| WatchError::Persist {
            reason: e.to_string(),
        })?
    }
}
