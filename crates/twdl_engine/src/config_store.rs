use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use twdl_core::AppConfig;
use twdl_logging::{twdl_info, twdl_warn};

use crate::persist::{AtomicFileWriter, PersistError};

pub const CONFIG_FILENAME: &str = "twdl.json";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot serialize configuration: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("cannot write configuration: {0}")]
    Persist(#[from] PersistError),
    #[error("configuration path {0} has no file name")]
    InvalidPath(PathBuf),
}

/// JSON-file backed [`AppConfig`].
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Never fails: a missing or broken file yields defaults, and a destination
    /// that is not a directory falls back to the working directory.
    pub fn load(&self) -> AppConfig {
        let mut config = match fs::read_to_string(&self.path) {
            Ok(text) => match serde_json::from_str::<AppConfig>(&text) {
                Ok(config) => {
                    twdl_info!("loaded configuration from {}", self.path.display());
                    config
                }
                Err(err) => {
                    twdl_warn!("ignoring unparsable {}: {}", self.path.display(), err);
                    AppConfig::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => AppConfig::default(),
            Err(err) => {
                twdl_warn!("cannot read {}: {}", self.path.display(), err);
                AppConfig::default()
            }
        };

        if !config.destination_directory.is_dir() {
            let fallback = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
            twdl_warn!(
                "destination {} is not a directory, using {}",
                config.destination_directory.display(),
                fallback.display()
            );
            config.destination_directory = fallback;
        }
        config
    }

    pub fn save(&self, config: &AppConfig) -> Result<(), ConfigError> {
        let file_name = self
            .path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ConfigError::InvalidPath(self.path.clone()))?;
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let mut json = serde_json::to_string_pretty(config)?;
        json.push('\n');
        AtomicFileWriter::new(dir).write(file_name, json)?;
        Ok(())
    }
}
