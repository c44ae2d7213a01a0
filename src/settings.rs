use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::mongo::engine::DEFAULT_PAGE_SIZE;

pub const SETTINGS_FILE_NAME: &str = "mongotui.toml";
pub const DEFAULT_LOG_FILE_NAME: &str = "mongotui.log";
pub const DEFAULT_OPERATION_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub page_size: u64,
    pub operation_timeout_secs: u64,
    pub log_file: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            operation_timeout_secs: DEFAULT_OPERATION_TIMEOUT_SECS,
            log_file: DEFAULT_LOG_FILE_NAME.to_string(),
        }
    }
}

impl Settings {
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_secs)
    }

    pub fn log_path(&self) -> PathBuf {
        PathBuf::from(&self.log_file)
    }

    fn normalize(mut self) -> Self {
        self.page_size = self.page_size.max(1);
        self.operation_timeout_secs = self.operation_timeout_secs.max(1);
        if self.log_file.trim().is_empty() {
            self.log_file = DEFAULT_LOG_FILE_NAME.to_string();
        }
        self
    }
}

#[derive(Debug, Error)]
pub enum SettingsLoadError {
    #[error("I/O error reading {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("parse error in {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Loads the settings file. The default file may be absent; a file named
/// explicitly with `--config` must exist.
pub fn load_from_disk(explicit: Option<&Path>) -> Result<Settings, SettingsLoadError> {
    let path = explicit.map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from(SETTINGS_FILE_NAME));
    match fs::read_to_string(&path) {
        Ok(contents) => toml::from_str::<Settings>(&contents)
            .map(Settings::normalize)
            .map_err(|source| SettingsLoadError::Parse { path, source }),
        Err(error) if error.kind() == io::ErrorKind::NotFound && explicit.is_none() => {
            Ok(Settings::default())
        }
        Err(source) => Err(SettingsLoadError::Io { path, source }),
    }
}
