//! Monitor configuration.
//!
//! Loading order:
//! 1. explicit path (`--config`)
//! 2. `$WIFI_LEVEL_CONFIG`
//! 3. `./wifi_level.toml`
//! 4. built-in defaults
//!
//! Command-line flags are applied on top by the binary.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::ConfigError;
use crate::recorder::DEFAULT_FILE_NAME_PATTERN;
use crate::series::capacity_for;

pub const CONFIG_ENV: &str = "WIFI_LEVEL_CONFIG";
pub const LOCAL_CONFIG: &str = "wifi_level.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Wireless interface handed to `iw`.
    pub interface: String,
    /// Time between two scan triggers.
    pub period_ms: u64,
    /// Span of history kept in the rolling series.
    pub display_window_ms: u64,
    pub separator: String,
    /// `time` format description for the session file name.
    pub file_name_pattern: String,
    pub output_dir: PathBuf,
    /// Number of buckets for the signal-strength gauge.
    pub signal_buckets: u32,
    pub bind: String,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interface: "wlan0".into(),
            period_ms: 4_000,
            display_window_ms: 30_000,
            separator: ";".into(),
            file_name_pattern: DEFAULT_FILE_NAME_PATTERN.into(),
            output_dir: PathBuf::from("."),
            signal_buckets: 20,
            bind: "127.0.0.1:8080".into(),
        }
    }
}

impl MonitorConfig {
    /// Resolve the config using the standard search order.
    ///
    /// An explicit path must load; the env and local fallbacks only warn.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            let config = Self::load_from_file(path)?;
            info!(path = %path.display(), "loaded config");
            return Ok(config);
        }

        if let Ok(path) = std::env::var(CONFIG_ENV) {
            let p = PathBuf::from(&path);
            match Self::load_from_file(&p) {
                Ok(config) => {
                    info!(path = %p.display(), "loaded config from {CONFIG_ENV}");
                    return Ok(config);
                }
                Err(e) => warn!(error = %e, "ignoring {CONFIG_ENV}"),
            }
        }

        let local = PathBuf::from(LOCAL_CONFIG);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("loaded config from ./{LOCAL_CONFIG}");
                    return Ok(config);
                }
                Err(e) => warn!(error = %e, "failed to load ./{LOCAL_CONFIG}, using defaults"),
            }
        }

        Ok(Self::default())
    }

    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();
        if self.period_ms == 0 {
            errors.push("period_ms must be > 0".to_string());
        }
        if self.display_window_ms == 0 {
            errors.push("display_window_ms must be > 0".to_string());
        }
        if self.separator.is_empty() {
            errors.push("separator must not be empty".to_string());
        }
        if self.separator.contains('\n') {
            errors.push("separator must not contain a newline".to_string());
        }
        if self.interface.trim().is_empty() {
            errors.push("interface must not be empty".to_string());
        }
        if self.signal_buckets == 0 {
            errors.push("signal_buckets must be > 0".to_string());
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Rolling series capacity implied by the window and period.
    pub fn series_capacity(&self) -> usize {
        capacity_for(self.display_window_ms, self.period_ms)
    }
}
