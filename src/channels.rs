use tracing::debug;

use crate::error::MonitorError;
use crate::types::{Band, ChannelPoint};

/// Channels plotted for the 2.4 GHz band.
pub const CHANNELS_2GHZ: &[i32] = &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11];

/// Channels plotted for the 5 GHz band.
pub const CHANNELS_5GHZ: &[i32] = &[
    36, 40, 44, 48, 52, 56, 60, 64, 100, 104, 108, 112, 116, 120, 124, 128, 132, 136, 140,
];

/// Frequencies above this (MHz) belong to the 5 GHz band.
const BAND_SPLIT_MHZ: i32 = 4_000;

/// Map a frequency in MHz to its channel number, or `0` when it is outside
/// both supported bands.
pub fn channel_for(frequency: i32) -> i32 {
    match frequency {
        2412..=2484 => (frequency - 2412) / 5 + 1,
        5170..=5825 => (frequency - 5170) / 5 + 34,
        _ => 0,
    }
}

impl Band {
    /// Fixed, ordered channel list for this band.
    pub fn channels(self) -> &'static [i32] {
        match self {
            Band::TwoPointFourGHz => CHANNELS_2GHZ,
            Band::FiveGHz => CHANNELS_5GHZ,
        }
    }
}

/// Band the table should show after observing `frequency` while on `current`.
///
/// Only the two crossings switch; `4000` itself keeps the current band.
pub fn next_band(current: Band, frequency: i32) -> Band {
    match current {
        Band::TwoPointFourGHz if frequency > BAND_SPLIT_MHZ => Band::FiveGHz,
        Band::FiveGHz if frequency < BAND_SPLIT_MHZ => Band::TwoPointFourGHz,
        other => other,
    }
}

/// Latest observed level per channel of the active band.
#[derive(Debug, Clone)]
pub struct ChannelTable {
    band: Band,
    levels: Vec<i32>,
}

impl ChannelTable {
    pub fn new(band: Band) -> Self {
        Self {
            band,
            levels: vec![0; band.channels().len()],
        }
    }

    /// Replace the table with `band`'s channel set, every level reset to 0.
    pub fn initialize(&mut self, band: Band) {
        debug!(%band, channels = band.channels().len(), "initializing channel table");
        *self = Self::new(band);
    }

    /// Overwrite the level stored for `channel`.
    pub fn record_level(&mut self, channel: i32, level: i32) -> Result<(), MonitorError> {
        let idx = self
            .band
            .channels()
            .iter()
            .position(|&c| c == channel)
            .ok_or(MonitorError::ChannelNotInTable {
                channel,
                band: self.band,
            })?;
        self.levels[idx] = level;
        Ok(())
    }

    pub fn band(&self) -> Band {
        self.band
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn level_of(&self, channel: i32) -> Option<i32> {
        let idx = self.band.channels().iter().position(|&c| c == channel)?;
        Some(self.levels[idx])
    }

    /// `(channel, level)` pairs in channel order.
    pub fn points(&self) -> Vec<ChannelPoint> {
        self.band
            .channels()
            .iter()
            .zip(&self.levels)
            .map(|(&channel, &level)| ChannelPoint { channel, level })
            .collect()
    }
}

impl Default for ChannelTable {
    fn default() -> Self {
        Self::new(Band::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_four_formula() {
        assert_eq!(channel_for(2412), 1);
        assert_eq!(channel_for(2437), 6);
        assert_eq!(channel_for(2472), 13);
        assert_eq!(channel_for(2484), 15);
        let mut prev = 0;
        for f in 2412..=2484 {
            let ch = channel_for(f);
            assert!(ch >= prev);
            assert_eq!(ch, (f - 2412) / 5 + 1);
            prev = ch;
        }
    }

    #[test]
    fn five_formula_and_out_of_range() {
        assert_eq!(channel_for(5170), 34);
        assert_eq!(channel_for(5180), 36);
        assert_eq!(channel_for(5320), 64);
        assert_eq!(channel_for(5825), 165);
        for f in [0, -5, 2411, 2485, 4000, 5169, 5826, 5955] {
            assert_eq!(channel_for(f), 0, "frequency {f}");
        }
    }

    #[test]
    fn band_switch_policy() {
        assert_eq!(next_band(Band::TwoPointFourGHz, 5180), Band::FiveGHz);
        assert_eq!(next_band(Band::FiveGHz, 2437), Band::TwoPointFourGHz);
        assert_eq!(next_band(Band::FiveGHz, 5180), Band::FiveGHz);
        assert_eq!(next_band(Band::TwoPointFourGHz, 2437), Band::TwoPointFourGHz);
        assert_eq!(next_band(Band::TwoPointFourGHz, 4000), Band::TwoPointFourGHz);
        assert_eq!(next_band(Band::FiveGHz, 4000), Band::FiveGHz);
    }

    #[test]
    fn record_level_touches_one_slot() {
        let mut table = ChannelTable::new(Band::TwoPointFourGHz);
        table.record_level(6, -45).unwrap();
        assert_eq!(table.len(), CHANNELS_2GHZ.len());
        for p in table.points() {
            let expected = if p.channel == 6 { -45 } else { 0 };
            assert_eq!(p.level, expected);
        }
    }

    #[test]
    fn record_level_outside_band_is_not_found() {
        let mut table = ChannelTable::new(Band::TwoPointFourGHz);
        let err = table.record_level(36, -60).unwrap_err();
        assert!(matches!(
            err,
            MonitorError::ChannelNotInTable { channel: 36, band: Band::TwoPointFourGHz }
        ));
        assert!(table.points().iter().all(|p| p.level == 0));
    }

    #[test]
    fn initialize_resets_levels() {
        let mut table = ChannelTable::new(Band::TwoPointFourGHz);
        table.record_level(1, -30).unwrap();
        table.initialize(Band::FiveGHz);
        assert_eq!(table.band(), Band::FiveGHz);
        assert_eq!(table.len(), 19);
        assert!(table.points().iter().all(|p| p.level == 0));
        table.record_level(140, -80).unwrap();
        assert_eq!(table.level_of(140), Some(-80));
    }
}
