use std::fmt;
use std::path::Path;

use serde::Serialize;
use tracing::{info, warn};

use crate::error::MonitorError;

/// Host capabilities the monitor needs before it may start sampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    AccessWifiState,
    ChangeWifiState,
    AccessLocation,
}

impl Capability {
    pub const REQUIRED: [Capability; 3] = [
        Capability::AccessWifiState,
        Capability::ChangeWifiState,
        Capability::AccessLocation,
    ];
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::AccessWifiState => "access wifi state",
            Self::ChangeWifiState => "change wifi state",
            Self::AccessLocation => "access location",
        };
        f.write_str(name)
    }
}

/// Permission subsystem of the host.
pub trait Permissions {
    fn check_granted(&self, capability: Capability) -> bool;

    /// Ask for `capability`; returns the host's answer.
    fn request_grant(&self, capability: Capability) -> bool;
}

/// Gate: every required capability granted, requesting each missing one once.
pub fn ensure_granted(permissions: &dyn Permissions) -> Result<(), MonitorError> {
    for capability in Capability::REQUIRED {
        if permissions.check_granted(capability) {
            continue;
        }
        info!(%capability, "requesting permission");
        if !permissions.request_grant(capability) {
            warn!(%capability, "permission denied");
            return Err(MonitorError::PermissionDenied { capability });
        }
    }
    Ok(())
}

/// Grants everything; used when replaying captured scans.
#[derive(Debug, Clone, Copy, Default)]
pub struct GrantAll;

impl Permissions for GrantAll {
    fn check_granted(&self, _capability: Capability) -> bool {
        true
    }

    fn request_grant(&self, _capability: Capability) -> bool {
        true
    }
}

/// Checks against the local Linux host.
///
/// Reading scan results needs a wireless interface; triggering scans needs
/// root unless only cached results are read. Linux has no location gate.
#[derive(Debug, Clone)]
pub struct HostPermissions {
    interface: String,
    cached: bool,
}

impl HostPermissions {
    pub fn new(interface: impl Into<String>, cached: bool) -> Self {
        Self {
            interface: interface.into(),
            cached,
        }
    }
}

impl Permissions for HostPermissions {
    fn check_granted(&self, capability: Capability) -> bool {
        match capability {
            Capability::AccessWifiState => Path::new("/sys/class/net")
                .join(&self.interface)
                .join("wireless")
                .exists(),
            Capability::ChangeWifiState => self.cached || effective_uid() == Some(0),
            Capability::AccessLocation => true,
        }
    }

    fn request_grant(&self, capability: Capability) -> bool {
        // Nothing to prompt on a terminal host; the answer is the current state.
        self.check_granted(capability)
    }
}

/// Effective uid of this process, read from `/proc/self/status`.
fn effective_uid() -> Option<u32> {
    let status = std::fs::read_to_string("/proc/self/status").ok()?;
    parse_effective_uid(&status)
}

fn parse_effective_uid(status: &str) -> Option<u32> {
    // "Uid:\treal\teffective\tsaved\tfs"
    status
        .lines()
        .find_map(|l| l.strip_prefix("Uid:"))
        .and_then(|rest| rest.split_whitespace().nth(1))
        .and_then(|euid| euid.parse().ok())
}
