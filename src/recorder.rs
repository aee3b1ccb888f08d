use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use ::time::{format_description, OffsetDateTime};
use tracing::info;

use crate::error::MonitorError;
use crate::types::SampleRecord;

/// Default session file name, formatted from the session start time (UTC).
pub const DEFAULT_FILE_NAME_PATTERN: &str = "wifi_[year][month][day]_[hour][minute][second].txt";

/// Append-only writer of one delimited text line per sample.
pub struct SampleRecorder {
    sink: Box<dyn Write + Send>,
    separator: String,
    path: Option<PathBuf>,
    written: u64,
    /// A failed write may have left part of a line in the sink.
    torn: bool,
}

impl SampleRecorder {
    /// Wrap an already open sink.
    pub fn new(sink: impl Write + Send + 'static, separator: impl Into<String>) -> Self {
        Self {
            sink: Box::new(sink),
            separator: separator.into(),
            path: None,
            written: 0,
            torn: false,
        }
    }

    /// Create the session file in `dir`, named from `now_millis` with `pattern`.
    pub fn open_session(
        dir: impl AsRef<Path>,
        pattern: &str,
        separator: &str,
        now_millis: i64,
    ) -> Result<Self, MonitorError> {
        let dir = dir.as_ref();
        let name = session_file_name(pattern, now_millis).map_err(|source| MonitorError::SinkOpen {
            path: dir.join(pattern),
            source,
        })?;
        let path = dir.join(name);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| MonitorError::SinkOpen {
                path: path.clone(),
                source,
            })?;
        info!(path = %path.display(), "opened sample file");
        let mut recorder = Self::new(file, separator);
        recorder.path = Some(path);
        Ok(recorder)
    }

    /// Append one sample line and flush it.
    ///
    /// After a failed write the next line starts with a newline, so a partial
    /// fragment never shares a line with a complete record.
    pub fn record(&mut self, sample: &SampleRecord) -> Result<(), MonitorError> {
        let mut line = String::new();
        if self.torn {
            line.push('\n');
        }
        line.push_str(&format_line(sample, &self.separator));
        line.push('\n');
        if let Err(e) = self
            .sink
            .write_all(line.as_bytes())
            .and_then(|_| self.sink.flush())
        {
            self.torn = true;
            return Err(MonitorError::SinkWrite(e));
        }
        self.torn = false;
        self.written += 1;
        Ok(())
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Number of lines successfully written this session.
    pub fn written(&self) -> u64 {
        self.written
    }
}

impl std::fmt::Debug for SampleRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SampleRecorder")
            .field("separator", &self.separator)
            .field("path", &self.path)
            .field("written", &self.written)
            .finish()
    }
}

/// `"<SSID> (<BSSID>)<sep><ts><sep><level><sep><channel><sep><frequency>"`
pub fn format_line(sample: &SampleRecord, separator: &str) -> String {
    format!(
        "{} ({}){sep}{}{sep}{}{sep}{}{sep}{}",
        sample.ssid,
        sample.bssid,
        sample.timestamp_millis,
        sample.level,
        sample.channel,
        sample.frequency,
        sep = separator
    )
}

/// Format the session file name for a start time given in Unix milliseconds.
pub fn session_file_name(pattern: &str, now_millis: i64) -> std::io::Result<String> {
    let desc = format_description::parse(pattern).map_err(invalid_input)?;
    let at = OffsetDateTime::from_unix_timestamp_nanos(now_millis as i128 * 1_000_000)
        .map_err(invalid_input)?;
    at.format(&desc).map_err(invalid_input)
}

fn invalid_input(e: impl std::fmt::Display) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
}
