//! commandcoord configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::coordinator::CoordinatorConfig;
use crate::robot::RobotConfig;

const LOCAL_CONFIG: &str = ".commandcoord.yml";

/// Main commandcoord configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error)
    #[serde(rename = "log-level", skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,

    /// Evaluator and status publication
    pub coordinator: CoordinatorConfig,

    /// Robot I/O and simulator
    pub robot: RobotConfig,
}

/// Just the log level, for reading before logging is set up
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LogLevelOnly {
    #[serde(rename = "log-level")]
    log_level: Option<String>,
}

impl Config {
    /// Load configuration with fallback chain
    ///
    /// An explicit path must load. Otherwise `.commandcoord.yml` in the
    /// working directory, then `~/.config/commandcoord/commandcoord.yml`, then
    /// defaults; a candidate that fails to load is warned about and skipped.
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        for candidate in Self::candidates() {
            if !candidate.exists() {
                continue;
            }
            match Self::load_from_file(&candidate) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", candidate.display(), e);
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Log level from the first config file in the chain that has one
    ///
    /// Never fails: this runs before logging exists, so problems are left
    /// for [`Config::load`] to report.
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        let read = |path: &Path| -> Option<String> {
            let content = fs::read_to_string(path).ok()?;
            serde_yaml::from_str::<LogLevelOnly>(&content).ok()?.log_level
        };

        match config_path {
            Some(path) => read(path),
            None => Self::candidates().iter().find_map(|p| read(p)),
        }
    }

    fn candidates() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(LOCAL_CONFIG)];
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("commandcoord").join("commandcoord.yml"));
        }
        paths
    }
}
