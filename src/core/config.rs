//! Runtime configuration, read from `lrs.toml`.

use crate::core::error::LrsError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "lrs.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LrsConfig {
    /// Holds the database and the audit log.
    pub data_dir: PathBuf,
    pub db_name: String,
    /// Public base URL; client endpoints are rendered under it.
    pub endpoint_base_url: String,
    /// `tracing_subscriber::EnvFilter` directive, overridden by `JISC_LRS_LOG`.
    pub log_filter: String,
    pub busy_timeout_secs: u32,
}

impl Default for LrsConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".jisc-lrs"),
            db_name: "lrs.db".to_string(),
            endpoint_base_url: "http://localhost:8000".to_string(),
            log_filter: "jisc_lrs=info".to_string(),
            busy_timeout_secs: 5,
        }
    }
}

impl LrsConfig {
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(&self.db_name)
    }

    pub fn parse(content: &str) -> Result<Self, LrsError> {
        toml::from_str(content).map_err(|e| LrsError::ConfigError(e.to_string()))
    }

    /// Load configuration.
    ///
    /// With an explicit `path` the file must exist. Without one, `lrs.toml` in the
    /// working directory is used when present and defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self, LrsError> {
        let (path, required) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };
        if !path.exists() {
            if required {
                return Err(LrsError::ConfigError(format!(
                    "config file {} does not exist",
                    path.display()
                )));
            }
            return Ok(Self::default());
        }
        let content = fs::read_to_string(&path)?;
        let config = Self::parse(&content)
            .map_err(|e| LrsError::ConfigError(format!("{}: {}", path.display(), e)))?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }
}
