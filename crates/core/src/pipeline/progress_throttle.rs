use std::time::{Duration, Instant};

use crate::shared::constants::PROGRESS_INTERVAL;

/// Rate-limits percent-complete updates for a single stream.
///
/// Intermediate percentages are capped at 99 and only emitted when they
/// changed and `interval` has elapsed since the last emission; the first
/// update always goes out. `finish` yields 100 exactly once.
pub struct ProgressThrottle {
    interval: Duration,
    last_emit: Option<Instant>,
    last_percent: Option<u8>,
    finished: bool,
}

impl ProgressThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_emit: None,
            last_percent: None,
            finished: false,
        }
    }

    /// Percent to report after `counted` of `total` frames, if any.
    ///
    /// An unknown total (0) never produces intermediate progress.
    pub fn update(&mut self, counted: usize, total: usize) -> Option<u8> {
        if total == 0 || self.finished {
            return None;
        }
        let percent = percent_of(counted, total);
        if self.last_percent == Some(percent) {
            return None;
        }
        let now = Instant::now();
        if let Some(last) = self.last_emit {
            if now.duration_since(last) < self.interval {
                return None;
            }
        }
        self.last_emit = Some(now);
        self.last_percent = Some(percent);
        Some(percent)
    }

    pub fn finish(&mut self) -> Option<u8> {
        if self.finished {
            return None;
        }
        self.finished = true;
        Some(100)
    }
}

impl Default for ProgressThrottle {
    fn default() -> Self {
        Self::new(PROGRESS_INTERVAL)
    }
}

/// `floor(min(counted, total) / total * 100)`, capped at 99.
fn percent_of(counted: usize, total: usize) -> u8 {
    let pct = counted.min(total) * 100 / total;
    pct.min(99) as u8
}
