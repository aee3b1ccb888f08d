use std::collections::VecDeque;

use crate::types::SeriesPoint;

/// Bounded history of the selected target's level, oldest first.
#[derive(Debug, Clone)]
pub struct RollingSeries {
    points: VecDeque<SeriesPoint>,
    capacity: usize,
}

impl RollingSeries {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            points: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Series holding one display window worth of samples taken every `period_ms`.
    pub fn for_window(display_window_ms: u64, period_ms: u64) -> Self {
        Self::with_capacity(capacity_for(display_window_ms, period_ms))
    }

    /// Append a sample, evicting from the front once over capacity.
    ///
    /// Times are stored as given; ordering is up to the caller.
    pub fn append(&mut self, elapsed_secs: f64, level: i32) {
        self.points.push_back(SeriesPoint {
            elapsed_secs,
            level,
        });
        while self.points.len() > self.capacity {
            self.points.pop_front();
        }
    }

    pub fn points(&self) -> impl ExactSizeIterator<Item = &SeriesPoint> + '_ {
        self.points.iter()
    }

    pub fn to_vec(&self) -> Vec<SeriesPoint> {
        self.points.iter().copied().collect()
    }

    pub fn last(&self) -> Option<&SeriesPoint> {
        self.points.back()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }
}

/// `floor(display_window_ms / period_ms)`, at least 1.
pub fn capacity_for(display_window_ms: u64, period_ms: u64) -> usize {
    if period_ms == 0 {
        return 1;
    }
    ((display_window_ms / period_ms) as usize).max(1)
}
