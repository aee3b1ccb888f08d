use serde::{Deserialize, Serialize};
use std::fmt;

/// Channel width class reported by the radio for one access point.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ChannelWidth {
    #[default]
    Mhz20,
    Mhz40,
    Mhz80,
    Mhz160,
    Other,
}

impl ChannelWidth {
    pub fn label(self) -> &'static str {
        match self {
            Self::Mhz20 => "20 MHz",
            Self::Mhz40 => "40 MHz",
            Self::Mhz80 => "80 MHz",
            Self::Mhz160 => "160 MHz",
            Self::Other => "Other",
        }
    }

    /// Map a width in MHz (as printed by `iw`) to its class.
    pub fn from_mhz(mhz: u32) -> Self {
        match mhz {
            20 => Self::Mhz20,
            40 => Self::Mhz40,
            80 => Self::Mhz80,
            160 => Self::Mhz160,
            _ => Self::Other,
        }
    }
}

/// One access point as seen in the last completed scan.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ScanResult {
    pub ssid: String,
    pub bssid: String,
    /// Center frequency in MHz.
    pub frequency: i32,
    /// Received level in dBm.
    pub level: i32,
    pub channel_width: ChannelWidth,
    /// Security flags, e.g. `[WPA2][ESS]`.
    pub capabilities: String,
}

/// Frequency band whose fixed channel set is currently plotted.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Band {
    #[default]
    #[serde(rename = "2.4ghz")]
    TwoPointFourGHz,
    #[serde(rename = "5ghz")]
    FiveGHz,
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TwoPointFourGHz => write!(f, "2.4 GHz"),
            Self::FiveGHz => write!(f, "5 GHz"),
        }
    }
}

/// One persisted reading of the selected access point.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SampleRecord {
    pub ssid: String,
    pub bssid: String,
    pub timestamp_millis: i64,
    pub level: i32,
    pub channel: i32,
    pub frequency: i32,
}

/// Latest display state of the selected access point.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TargetSnapshot {
    pub ssid: String,
    pub bssid: String,
    pub channel: i32,
    pub frequency: i32,
    pub width: String,
    pub capabilities: String,
    pub secured: bool,
    pub level: i32,
    pub signal_bucket: u32,
    pub timestamp_millis: i64,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelPoint {
    pub channel: i32,
    pub level: i32,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct SeriesPoint {
    pub elapsed_secs: f64,
    pub level: i32,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CycleState {
    #[default]
    Idle,
    Scanning,
}

/// Summary of the running session for the status endpoint.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CycleStatus {
    pub state: CycleState,
    pub band: Band,
    pub selection: String,
    pub samples: u64,
    pub write_failures: u64,
    pub series_len: usize,
    pub series_capacity: usize,
    pub sample_file: Option<String>,
}

/// What a single `on_scan_results_available` call did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// No session is running; the radio was not touched.
    Inactive,
    /// The radio could not deliver results this cycle.
    ScanUnavailable,
    /// Nothing selected; only the candidate list was refreshed.
    CandidatesOnly,
    /// The selected BSSID is absent from this scan.
    NoMatch,
    Sampled(SampleRecord),
}

/// Label shown in the target selector: `"<SSID> (<BSSID>)"`.
pub fn candidate_label(result: &ScanResult) -> String {
    format!("{} ({})", result.ssid, result.bssid)
}

/// Extract the BSSID from a selector label, i.e. the text between the parentheses.
pub fn bssid_from_label(label: &str) -> Option<&str> {
    let open = label.rfind('(')?;
    let close = label[open..].find(')')? + open;
    let bssid = label[open + 1..close].trim();
    (!bssid.is_empty()).then_some(bssid)
}

/// Whether the capability flags announce any encryption.
pub fn is_secured(capabilities: &str) -> bool {
    capabilities.contains("WPA") || capabilities.contains("WEP")
}

/// Bucket a dBm level into `0..buckets`, linear between -100 and -55 dBm.
pub fn signal_bucket(level: i32, buckets: u32) -> u32 {
    const MIN_RSSI: i32 = -100;
    const MAX_RSSI: i32 = -55;
    if buckets == 0 {
        return 0;
    }
    if level <= MIN_RSSI {
        0
    } else if level >= MAX_RSSI {
        buckets - 1
    } else {
        let span = (MAX_RSSI - MIN_RSSI) as i64;
        ((level - MIN_RSSI) as i64 * (buckets as i64 - 1) / span) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ap(ssid: &str, bssid: &str) -> ScanResult {
        ScanResult {
            ssid: ssid.into(),
            bssid: bssid.into(),
            frequency: 2437,
            level: -50,
            channel_width: ChannelWidth::Mhz20,
            capabilities: String::new(),
        }
    }

    #[test]
    fn label_round_trips_to_bssid() {
        let label = candidate_label(&ap("Home", "aa:bb:cc:dd:ee:ff"));
        assert_eq!(label, "Home (aa:bb:cc:dd:ee:ff)");
        assert_eq!(bssid_from_label(&label), Some("aa:bb:cc:dd:ee:ff"));
    }

    #[test]
    fn label_with_parentheses_in_ssid() {
        assert_eq!(
            bssid_from_label("Cafe (guest) (11:22:33:44:55:66)"),
            Some("11:22:33:44:55:66")
        );
        assert_eq!(bssid_from_label("no bssid here"), None);
        assert_eq!(bssid_from_label("empty ()"), None);
    }

    #[test]
    fn security_detection() {
        assert!(is_secured("[WPA2-PSK-CCMP][ESS]"));
        assert!(is_secured("[WEP][ESS]"));
        assert!(!is_secured("[ESS]"));
    }

    #[test]
    fn bucket_edges() {
        assert_eq!(signal_bucket(-100, 20), 0);
        assert_eq!(signal_bucket(-120, 20), 0);
        assert_eq!(signal_bucket(-55, 20), 19);
        assert_eq!(signal_bucket(-30, 20), 19);
        // (-70 + 100) * 19 / 45 = 12
        assert_eq!(signal_bucket(-70, 20), 12);
        assert_eq!(signal_bucket(-70, 0), 0);
    }

    #[test]
    fn width_labels() {
        assert_eq!(ChannelWidth::from_mhz(80).label(), "80 MHz");
        assert_eq!(ChannelWidth::from_mhz(320), ChannelWidth::Other);
    }
}
