use shared_models::{TimeOfDay, TimeRange};

use crate::models::ProviderError;

/// Candidate start times for one working window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotGenerator {
    window: TimeRange,
    granularity_minutes: u32,
}

impl SlotGenerator {
    pub fn new(window: TimeRange, granularity_minutes: u32) -> Result<Self, ProviderError> {
        if granularity_minutes == 0 {
            return Err(ProviderError::InvalidGranularity(granularity_minutes));
        }
        Ok(Self { window, granularity_minutes })
    }

    pub fn window(&self) -> TimeRange {
        self.window
    }

    pub fn granularity_minutes(&self) -> u32 {
        self.granularity_minutes
    }

    /// Start times from the window start, stepped by the granularity, strictly
    /// before the window end. Each call starts a fresh sequence.
    pub fn slots(&self) -> Slots {
        Slots {
            cursor: self.window.start().minutes_since_midnight(),
            end: self.window.end().minutes_since_midnight(),
            step: self.granularity_minutes,
        }
    }

    /// True when `time` is one of the generated start times.
    pub fn is_aligned(&self, time: TimeOfDay) -> bool {
        let start = self.window.start().minutes_since_midnight();
        let minutes = time.minutes_since_midnight();
        minutes >= start && (minutes - start) % self.granularity_minutes == 0
    }
}

impl IntoIterator for &SlotGenerator {
    type Item = TimeOfDay;
    type IntoIter = Slots;

    fn into_iter(self) -> Slots {
        self.slots()
    }
}

#[derive(Debug, Clone)]
pub struct Slots {
    cursor: u32,
    end: u32,
    step: u32,
}

impl Iterator for Slots {
    type Item = TimeOfDay;

    fn next(&mut self) -> Option<TimeOfDay> {
        if self.cursor >= self.end {
            return None;
        }
        let slot = TimeOfDay::from_minutes(self.cursor)?;
        self.cursor += self.step;
        Some(slot)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = if self.cursor >= self.end {
            0
        } else {
            ((self.end - self.cursor).div_ceil(self.step)) as usize
        };
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Slots {}
