//! The sampling session: one value holding every piece of mutable state,
//! driven by the host through [`ScanCycle::on_scan_results_available`].

use ::time::OffsetDateTime;
use tracing::{debug, error, info, warn};

use crate::channels::{channel_for, next_band, ChannelTable};
use crate::config::MonitorConfig;
use crate::error::MonitorError;
use crate::permissions::{ensure_granted, Capability, Permissions};
use crate::radio::Radio;
use crate::recorder::SampleRecorder;
use crate::series::RollingSeries;
use crate::types::{
    bssid_from_label, candidate_label, is_secured, signal_bucket, Band, CycleOutcome, CycleState,
    CycleStatus, SampleRecord, ScanResult, TargetSnapshot,
};

/// Wall-clock source, in Unix milliseconds.
pub trait Clock: Send {
    fn now_millis(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
    }
}

pub struct ScanCycle<R, C = SystemClock> {
    radio: R,
    clock: C,
    state: CycleState,
    selection: String,
    table: ChannelTable,
    series: RollingSeries,
    recorder: Option<SampleRecorder>,
    candidates: Vec<String>,
    target: Option<TargetSnapshot>,
    session_start_ms: i64,
    signal_buckets: u32,
    samples: u64,
    write_failures: u64,
}

impl<R: Radio> ScanCycle<R, SystemClock> {
    pub fn new(radio: R, config: &MonitorConfig) -> Self {
        Self::with_clock(radio, SystemClock, config)
    }
}

impl<R: Radio, C: Clock> ScanCycle<R, C> {
    pub fn with_clock(radio: R, clock: C, config: &MonitorConfig) -> Self {
        let session_start_ms = clock.now_millis();
        Self {
            radio,
            clock,
            state: CycleState::Idle,
            selection: String::new(),
            table: ChannelTable::new(Band::TwoPointFourGHz),
            series: RollingSeries::with_capacity(config.series_capacity()),
            recorder: None,
            candidates: Vec::new(),
            target: None,
            session_start_ms,
            signal_buckets: config.signal_buckets,
            samples: 0,
            write_failures: 0,
        }
    }

    /// Enter `Scanning`.
    ///
    /// Requires every capability granted and a sink; `open_sink` receives the
    /// session start time. On error the cycle stays `Idle`.
    pub fn start<F>(
        &mut self,
        permissions: &dyn Permissions,
        open_sink: F,
    ) -> Result<(), MonitorError>
    where
        F: FnOnce(i64) -> Result<SampleRecorder, MonitorError>,
    {
        if self.state == CycleState::Scanning {
            return Ok(());
        }
        ensure_granted(permissions)?;
        let now = self.clock.now_millis();
        let recorder = open_sink(now)?;

        self.recorder = Some(recorder);
        self.session_start_ms = now;
        self.series.clear();
        self.samples = 0;
        self.write_failures = 0;
        self.state = CycleState::Scanning;
        if let Err(e) = self.radio.start_scan() {
            warn!(error = %e, "initial scan trigger failed");
        }
        info!(selection = %self.selection, "sampling session started");
        Ok(())
    }

    /// Stop triggering scans and close the sink.
    pub fn stop(&mut self) {
        if self.state == CycleState::Idle {
            return;
        }
        self.state = CycleState::Idle;
        if let Some(rec) = self.recorder.take() {
            info!(samples = rec.written(), "sampling session stopped");
        }
    }

    /// Answer from the permission subsystem; a revocation ends the session.
    pub fn on_permission_result(&mut self, capability: Capability, granted: bool) {
        if !granted && self.state == CycleState::Scanning {
            warn!(%capability, "permission revoked, stopping");
            self.stop();
        }
    }

    /// Set the target BSSID; an empty string suppresses sampling.
    pub fn selection_changed(&mut self, bssid: impl Into<String>) {
        let bssid = bssid.into();
        if bssid != self.selection {
            debug!(from = %self.selection, to = %bssid, "selection changed");
            self.selection = bssid;
        }
    }

    /// Select from a candidate label such as `"Home (aa:bb:cc:dd:ee:ff)"`.
    pub fn select_label(&mut self, label: &str) -> bool {
        match bssid_from_label(label) {
            Some(bssid) => {
                let bssid = bssid.to_string();
                self.selection_changed(bssid);
                true
            }
            None => false,
        }
    }

    /// Handle one "scan results available" event.
    pub fn on_scan_results_available(&mut self) -> CycleOutcome {
        if self.state == CycleState::Idle {
            return CycleOutcome::Inactive;
        }

        if let Err(e) = self.radio.start_scan() {
            warn!(error = %e, "scan trigger failed");
        }
        let results = match self.radio.scan_results() {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "scan results unavailable");
                return CycleOutcome::ScanUnavailable;
            }
        };

        self.candidates = results.iter().map(candidate_label).collect();
        if self.selection.is_empty() {
            return CycleOutcome::CandidatesOnly;
        }

        let Some(ap) = results.iter().find(|r| r.bssid == self.selection) else {
            debug!(
                selection = %self.selection,
                visible = results.len(),
                "selected BSSID not in scan"
            );
            return CycleOutcome::NoMatch;
        };
        CycleOutcome::Sampled(self.accept(ap))
    }

    fn accept(&mut self, ap: &ScanResult) -> SampleRecord {
        let now = self.clock.now_millis();
        let channel = channel_for(ap.frequency);

        let band = next_band(self.table.band(), ap.frequency);
        if band != self.table.band() {
            info!(from = %self.table.band(), to = %band, frequency = ap.frequency, "band switch");
            self.table.initialize(band);
        }
        if let Err(e) = self.table.record_level(channel, ap.level) {
            error!(
                error = %e,
                frequency = ap.frequency,
                bssid = %ap.bssid,
                "channel table out of sync with band"
            );
        }

        // A wall clock stepped back behind the session start reads as zero.
        let elapsed_secs = ((now - self.session_start_ms).max(0) / 1_000) as f64;
        self.series.append(elapsed_secs, ap.level);

        self.target = Some(TargetSnapshot {
            ssid: ap.ssid.clone(),
            bssid: ap.bssid.clone(),
            channel,
            frequency: ap.frequency,
            width: ap.channel_width.label().to_string(),
            capabilities: ap.capabilities.clone(),
            secured: is_secured(&ap.capabilities),
            level: ap.level,
            signal_bucket: signal_bucket(ap.level, self.signal_buckets),
            timestamp_millis: now,
        });

        let record = SampleRecord {
            ssid: ap.ssid.clone(),
            bssid: ap.bssid.clone(),
            timestamp_millis: now,
            level: ap.level,
            channel,
            frequency: ap.frequency,
        };
        self.samples += 1;
        if let Some(rec) = self.recorder.as_mut() {
            if let Err(e) = rec.record(&record) {
                self.write_failures += 1;
                warn!(error = %e, "sample not persisted");
            }
        }
        debug!(channel, level = ap.level, elapsed_secs, "sample accepted");
        record
    }

    pub fn state(&self) -> CycleState {
        self.state
    }

    pub fn selection(&self) -> &str {
        &self.selection
    }

    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    pub fn target(&self) -> Option<&TargetSnapshot> {
        self.target.as_ref()
    }

    pub fn series(&self) -> &RollingSeries {
        &self.series
    }

    pub fn channel_table(&self) -> &ChannelTable {
        &self.table
    }

    pub fn band(&self) -> Band {
        self.table.band()
    }

    pub fn recorder(&self) -> Option<&SampleRecorder> {
        self.recorder.as_ref()
    }

    pub fn radio_mut(&mut self) -> &mut R {
        &mut self.radio
    }

    pub fn status(&self) -> CycleStatus {
        CycleStatus {
            state: self.state,
            band: self.table.band(),
            selection: self.selection.clone(),
            samples: self.samples,
            write_failures: self.write_failures,
            series_len: self.series.len(),
            series_capacity: self.series.capacity(),
            sample_file: self
                .recorder
                .as_ref()
                .and_then(SampleRecorder::path)
                .map(|p| p.display().to_string()),
        }
    }
}
