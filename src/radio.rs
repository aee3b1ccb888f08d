//! Radio backends delivering scan snapshots to the sampling engine.
//!
//! [`IwRadio`] shells out to `iw dev <iface> scan trigger` (fire-and-forget)
//! and reads the completed results with `iw dev <iface> scan dump`.
//! [`DumpFileRadio`] replays a captured dump file, which needs no privileges.

use std::path::PathBuf;
use std::process::{Child, Command, Stdio};

use tracing::{debug, warn};

use crate::error::RadioError;
use crate::types::{ChannelWidth, ScanResult};

/// Source of scan results.
pub trait Radio: Send {
    /// Ask the hardware for a new scan without waiting for it to finish.
    fn start_scan(&mut self) -> Result<(), RadioError>;

    /// Results of the last completed scan.
    fn scan_results(&mut self) -> Result<Vec<ScanResult>, RadioError>;
}

impl<R: Radio + ?Sized> Radio for Box<R> {
    fn start_scan(&mut self) -> Result<(), RadioError> {
        (**self).start_scan()
    }

    fn scan_results(&mut self) -> Result<Vec<ScanResult>, RadioError> {
        (**self).scan_results()
    }
}

/// Linux backend built on the `iw` tool.
#[derive(Debug)]
pub struct IwRadio {
    interface: String,
    cached: bool,
    pending: Option<Child>,
}

impl IwRadio {
    pub fn new(interface: impl Into<String>) -> Self {
        Self {
            interface: interface.into(),
            cached: false,
            pending: None,
        }
    }

    /// Never trigger scans; only read what the kernel already has cached.
    /// Triggering needs `CAP_NET_ADMIN`, reading the cache does not.
    pub fn cached(mut self) -> Self {
        self.cached = true;
        self
    }

    pub fn interface(&self) -> &str {
        &self.interface
    }

    /// True while a previously triggered scan process is still running.
    fn trigger_in_flight(&mut self) -> bool {
        match self.pending.as_mut().map(Child::try_wait) {
            Some(Ok(None)) => true,
            Some(Ok(Some(status))) => {
                if !status.success() {
                    warn!(iface = %self.interface, %status, "scan trigger failed");
                }
                self.pending = None;
                false
            }
            Some(Err(e)) => {
                warn!(iface = %self.interface, error = %e, "lost track of scan trigger");
                self.pending = None;
                false
            }
            None => false,
        }
    }
}

impl Drop for IwRadio {
    fn drop(&mut self) {
        if let Some(mut child) = self.pending.take() {
            if let Ok(None) = child.try_wait() {
                let _ = child.kill();
                let _ = child.wait();
            }
        }
    }
}

impl Radio for IwRadio {
    fn start_scan(&mut self) -> Result<(), RadioError> {
        if self.cached {
            return Ok(());
        }
        if self.trigger_in_flight() {
            debug!(iface = %self.interface, "previous scan trigger still running");
            return Ok(());
        }
        let child = Command::new("iw")
            .args(["dev", &self.interface, "scan", "trigger"])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| RadioError::Spawn {
                command: format!("iw dev {} scan trigger", self.interface),
                source,
            })?;
        self.pending = Some(child);
        Ok(())
    }

    fn scan_results(&mut self) -> Result<Vec<ScanResult>, RadioError> {
        let command = format!("iw dev {} scan dump", self.interface);
        let output = Command::new("iw")
            .args(["dev", &self.interface, "scan", "dump"])
            .output()
            .map_err(|source| RadioError::Spawn {
                command: command.clone(),
                source,
            })?;
        if !output.status.success() {
            return Err(RadioError::Failed {
                command,
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(parse_iw_scan_dump(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Replays a captured `iw ... scan dump` file on every cycle.
#[derive(Debug, Clone)]
pub struct DumpFileRadio {
    path: PathBuf,
}

impl DumpFileRadio {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Radio for DumpFileRadio {
    fn start_scan(&mut self) -> Result<(), RadioError> {
        Ok(())
    }

    fn scan_results(&mut self) -> Result<Vec<ScanResult>, RadioError> {
        let text = std::fs::read_to_string(&self.path).map_err(|source| RadioError::Dump {
            path: self.path.clone(),
            source,
        })?;
        Ok(parse_iw_scan_dump(&text))
    }
}

#[derive(Default)]
struct Stanza {
    bssid: String,
    ssid: String,
    frequency: Option<i32>,
    level: Option<i32>,
    ess: bool,
    privacy: bool,
    wpa: bool,
    rsn: bool,
    width: Option<ChannelWidth>,
}

impl Stanza {
    fn finish(self) -> ScanResult {
        let mut caps = String::new();
        if self.rsn {
            caps.push_str("[WPA2]");
        }
        if self.wpa {
            caps.push_str("[WPA]");
        }
        if self.privacy && !self.rsn && !self.wpa {
            caps.push_str("[WEP]");
        }
        if self.ess {
            caps.push_str("[ESS]");
        }
        ScanResult {
            ssid: self.ssid,
            bssid: self.bssid,
            frequency: self.frequency.unwrap_or(0),
            level: self.level.unwrap_or(-100),
            channel_width: self.width.unwrap_or_default(),
            capabilities: caps,
        }
    }
}

/// Parse the output of `iw dev <iface> scan [dump]`.
///
/// Each access point starts with a `BSS <mac>` line at column 0; stanzas
/// whose MAC cannot be read are skipped.
pub fn parse_iw_scan_dump(output: &str) -> Vec<ScanResult> {
    let mut results = Vec::new();
    let mut current: Option<Stanza> = None;

    for line in output.lines() {
        if let Some(rest) = line.strip_prefix("BSS ") {
            if let Some(done) = current.take() {
                results.push(done.finish());
            }
            let mac_end = rest
                .find(|c: char| !c.is_ascii_hexdigit() && c != ':')
                .unwrap_or(rest.len());
            let mac = &rest[..mac_end];
            if mac.len() == 17 {
                current = Some(Stanza {
                    bssid: mac.to_string(),
                    ..Stanza::default()
                });
            }
            continue;
        }

        let Some(st) = current.as_mut() else {
            continue;
        };
        let trimmed = line.trim();
        if let Some(rest) = trimmed.strip_prefix("freq:") {
            // Newer iw prints "2437.0".
            st.frequency = rest.trim().parse::<f64>().ok().map(|f| f as i32);
        } else if let Some(rest) = trimmed.strip_prefix("signal:") {
            st.level = rest
                .split_whitespace()
                .next()
                .and_then(|n| n.parse::<f64>().ok())
                .map(|dbm| dbm.round() as i32);
        } else if let Some(rest) = trimmed.strip_prefix("SSID:") {
            st.ssid = rest.trim().to_string();
        } else if let Some(rest) = trimmed.strip_prefix("capability:") {
            st.ess = rest.split_whitespace().any(|w| w == "ESS");
            st.privacy = rest.split_whitespace().any(|w| w == "Privacy");
        } else if trimmed.starts_with("RSN:") {
            st.rsn = true;
        } else if trimmed.starts_with("WPA:") {
            st.wpa = true;
        } else if let Some(rest) = trimmed.strip_prefix("* secondary channel offset:") {
            if matches!(rest.trim(), "above" | "below") && st.width.is_none() {
                st.width = Some(ChannelWidth::Mhz40);
            }
        } else if let Some(rest) = trimmed.strip_prefix("* channel width:") {
            // VHT operation: "1 (80 MHz)", "2 (160 MHz)", "3 (80+80 MHz)".
            match rest.split_whitespace().next() {
                Some("1") => st.width = Some(ChannelWidth::Mhz80),
                Some("2") => st.width = Some(ChannelWidth::Mhz160),
                Some("3") => st.width = Some(ChannelWidth::Other),
                _ => {}
            }
        }
    }

    if let Some(done) = current.take() {
        results.push(done.finish());
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;

    const DUMP: &str = "\
BSS aa:bb:cc:dd:ee:ff(on wlan0) -- associated
\tTSF: 123456789 usec
\tfreq: 5180
\tbeacon interval: 100 TUs
\tcapability: ESS Privacy ShortSlotTime (0x0411)
\tsignal: -52.00 dBm
\tSSID: HomeNetwork
\tRSN:\t * Version: 1
\t\t * Group cipher: CCMP
\tHT operation:
\t\t * primary channel: 36
\t\t * secondary channel offset: above
\tVHT operation:
\t\t * channel width: 1 (80 MHz)
BSS 11:22:33:44:55:66(on wlan0)
\tfreq: 2437.0
\tcapability: ESS ShortSlotTime (0x0401)
\tsignal: -70.50 dBm
\tSSID: OpenCafe
\tHT operation:
\t\t * secondary channel offset: no secondary
BSS 22:33:44:55:66:77(on wlan0)
\tfreq: 2412
\tcapability: ESS Privacy (0x0011)
\tsignal: -81.00 dBm
\tSSID: OldRouter
BSS garbage
\tfreq: 2412
";

    #[test]
    fn parses_stanzas() {
        let aps = parse_iw_scan_dump(DUMP);
        assert_eq!(aps.len(), 3);

        assert_eq!(aps[0].bssid, "aa:bb:cc:dd:ee:ff");
        assert_eq!(aps[0].ssid, "HomeNetwork");
        assert_eq!(aps[0].frequency, 5180);
        assert_eq!(aps[0].level, -52);
        assert_eq!(aps[0].channel_width, ChannelWidth::Mhz80);
        assert_eq!(aps[0].capabilities, "[WPA2][ESS]");

        assert_eq!(aps[1].frequency, 2437);
        assert_eq!(aps[1].level, -71);
        assert_eq!(aps[1].channel_width, ChannelWidth::Mhz20);
        assert_eq!(aps[1].capabilities, "[ESS]");

        assert_eq!(aps[2].capabilities, "[WEP][ESS]");
    }

    #[test]
    fn sta_channel_width_line_is_not_a_width() {
        let dump = "\
BSS 33:44:55:66:77:88(on wlan0)
\tfreq: 2462
\tsignal: -60.00 dBm
\tSSID: Wide
\tHT operation:
\t\t * primary channel: 11
\t\t * secondary channel offset: below
\t\t * STA channel width: any
BSS 44:55:66:77:88:99(on wlan0)
\tfreq: 2412
\tsignal: -60.00 dBm
\tSSID: Narrow
\tHT operation:
\t\t * secondary channel offset: no secondary
\t\t * STA channel width: 20 MHz
";
        let aps = parse_iw_scan_dump(dump);
        assert_eq!(aps.len(), 2);
        assert_eq!(aps[0].channel_width, ChannelWidth::Mhz40);
        assert_eq!(aps[1].channel_width, ChannelWidth::Mhz20);
    }

    #[test]
    fn drop_reaps_running_trigger() {
        let child = Command::new("sleep").arg("30").spawn().unwrap();
        let pid = child.id();
        let mut radio = IwRadio::new("wlan-test");
        radio.pending = Some(child);
        drop(radio);
        assert!(!std::path::Path::new(&format!("/proc/{pid}")).exists());
    }

    #[test]
    fn empty_dump() {
        assert!(parse_iw_scan_dump("").is_empty());
    }

    #[test]
    fn dump_file_radio_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.txt");
        std::fs::write(&path, DUMP).unwrap();
        let mut radio = DumpFileRadio::new(&path);
        radio.start_scan().unwrap();
        assert_eq!(radio.scan_results().unwrap().len(), 3);

        let mut missing = DumpFileRadio::new(dir.path().join("missing.txt"));
        assert!(matches!(missing.scan_results(), Err(RadioError::Dump { .. })));
    }
}
