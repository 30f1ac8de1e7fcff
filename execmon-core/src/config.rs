//! Monitor configuration.

use crate::listener::DispatchPolicy;
use execmon_types::{SourceKey, Tick};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    ParseError(#[from] serde_yaml::Error),
}

/// Startup settings for a monitor session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Trace log directory
    #[serde(default = "default_log_path")]
    pub log_path: PathBuf,

    /// Tick to show first; the first recorded tick when absent
    #[serde(default)]
    pub initial_tick: Option<Tick>,

    /// Zero-padding width of the tick entry
    #[serde(default = "default_tick_width")]
    pub tick_width: usize,

    #[serde(default)]
    pub dispatch_policy: DispatchPolicy,

    /// Source key the token network subscribes under
    #[serde(default)]
    pub network_source: SourceKey,
}

fn default_log_path() -> PathBuf {
    PathBuf::from(".")
}

fn default_tick_width() -> usize {
    6
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            log_path: default_log_path(),
            initial_tick: None,
            tick_width: default_tick_width(),
            dispatch_policy: DispatchPolicy::default(),
            network_source: SourceKey::All,
        }
    }
}

impl MonitorConfig {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let config: MonitorConfig = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// Defaults with the given log directory
    pub fn for_log_path<P: Into<PathBuf>>(log_path: P) -> Self {
        Self {
            log_path: log_path.into(),
            ..Self::default()
        }
    }
}
