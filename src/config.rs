use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::analysis::{
    AnalysisError, Analyzer, HttpAnalyzer, LocalAnalyzer, DEFAULT_ENDPOINT, DEFAULT_TIMEOUT_SECS,
};
use crate::app_dirs::AppDirs;
use crate::session::DEFAULT_DURATION_SECS;

pub const MAX_DURATION_SECS: u32 = 3600;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("session length must be between 1 and {max} seconds, got {0}", max = MAX_DURATION_SECS)]
    Duration(u32),
    #[error("analysis endpoint must be an http(s) url, got `{0}`")]
    Endpoint(String),
    #[error("request timeout must be at least one second")]
    Timeout,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub duration_secs: u32,
    pub endpoint: String,
    pub offline: bool,
    pub request_timeout_secs: u64,
    pub samples: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            duration_secs: DEFAULT_DURATION_SECS,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            offline: false,
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            samples: None,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.duration_secs == 0 || self.duration_secs > MAX_DURATION_SECS {
            return Err(ConfigError::Duration(self.duration_secs));
        }
        if !self.offline
            && !(self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://"))
        {
            return Err(ConfigError::Endpoint(self.endpoint.clone()));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Timeout);
        }
        Ok(())
    }

    pub fn build_analyzer(&self) -> Result<Arc<dyn Analyzer>, AnalysisError> {
        if self.offline {
            return Ok(Arc::new(LocalAnalyzer));
        }

        let analyzer = HttpAnalyzer::new(
            self.endpoint.clone(),
            Duration::from_secs(self.request_timeout_secs),
        )?;
        Ok(Arc::new(analyzer))
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = AppDirs::config_path().unwrap_or_else(|| PathBuf::from("typetally_config.json"));
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        match fs::read(&self.path) {
            Ok(bytes) => match serde_json::from_slice::<Config>(&bytes) {
                Ok(cfg) => cfg,
                Err(e) => {
                    tracing::warn!(path = %self.path.display(), error = %e, "ignoring unreadable config");
                    Config::default()
                }
            },
            Err(_) => Config::default(),
        }
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg).unwrap_or_default();
        fs::write(&self.path, data)
    }
}
