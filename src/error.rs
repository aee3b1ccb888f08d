use std::path::PathBuf;

use thiserror::Error;

use crate::permissions::Capability;
use crate::types::Band;

/// Errors raised by the sampling engine.
///
/// Only `PermissionDenied` and `SinkOpen` prevent a session from starting;
/// everything else is absorbed by the cycle that hit it.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("permission not granted: {capability}")]
    PermissionDenied { capability: Capability },

    #[error("failed to open sample file {}: {source}", path.display())]
    SinkOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write sample: {0}")]
    SinkWrite(#[source] std::io::Error),

    #[error("channel {channel} is not in the {band} channel table")]
    ChannelNotInTable { channel: i32, band: Band },

    #[error(transparent)]
    Radio(#[from] RadioError),
}

/// Errors from the radio backend.
#[derive(Debug, Error)]
pub enum RadioError {
    #[error("failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with {status}: {stderr}")]
    Failed {
        command: String,
        status: std::process::ExitStatus,
        stderr: String,
    },

    #[error("failed to read scan dump {}: {source}", path.display())]
    Dump {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from loading or validating `MonitorConfig`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config I/O error ({}): {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config parse error ({}): {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config: {}", .0.join("; "))]
    Validation(Vec<String>),
}
