use std::fmt;

use serde::{Deserialize, Serialize};

pub const MIN_START_HOUR: u8 = 0;
pub const MAX_START_HOUR: u8 = 22;
pub const MIN_END_HOUR: u8 = 1;
pub const MAX_END_HOUR: u8 = 23;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TimeWindowError {
    StartOutOfRange(u8),
    EndOutOfRange(u8),
    Empty { start_hour: u8, end_hour: u8 },
}

impl fmt::Display for TimeWindowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeWindowError::StartOutOfRange(hour) => write!(
                f,
                "start_hour must be between {MIN_START_HOUR} and {MAX_START_HOUR}, got {hour}"
            ),
            TimeWindowError::EndOutOfRange(hour) => write!(
                f,
                "end_hour must be between {MIN_END_HOUR} and {MAX_END_HOUR}, got {hour}"
            ),
            TimeWindowError::Empty {
                start_hour,
                end_hour,
            } => write!(
                f,
                "start_hour must be less than end_hour, got {start_hour} >= {end_hour}"
            ),
        }
    }
}

impl std::error::Error for TimeWindowError {}

/// Hours of the day a popularity query covers. Always spans at least one hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawTimeWindow")]
pub struct TimeWindow {
    start_hour: u8,
    end_hour: u8,
}

#[derive(Deserialize)]
struct RawTimeWindow {
    start_hour: u8,
    end_hour: u8,
}

impl TryFrom<RawTimeWindow> for TimeWindow {
    type Error = TimeWindowError;

    fn try_from(raw: RawTimeWindow) -> Result<Self, Self::Error> {
        TimeWindow::new(raw.start_hour, raw.end_hour)
    }
}

impl TimeWindow {
    pub fn new(start_hour: u8, end_hour: u8) -> Result<Self, TimeWindowError> {
        if start_hour > MAX_START_HOUR {
            return Err(TimeWindowError::StartOutOfRange(start_hour));
        }
        if !(MIN_END_HOUR..=MAX_END_HOUR).contains(&end_hour) {
            return Err(TimeWindowError::EndOutOfRange(end_hour));
        }
        if start_hour >= end_hour {
            return Err(TimeWindowError::Empty {
                start_hour,
                end_hour,
            });
        }

        Ok(TimeWindow {
            start_hour,
            end_hour,
        })
    }

    pub fn start_hour(&self) -> u8 {
        self.start_hour
    }

    pub fn end_hour(&self) -> u8 {
        self.end_hour
    }

    /// Moves the start of the window, pushing the end out when they would cross
    pub fn set_start_hour(&mut self, hour: u8) {
        let hour = hour.min(MAX_START_HOUR);
        self.start_hour = hour;
        if self.end_hour <= hour {
            self.end_hour = hour + 1;
        }
    }

    /// Moves the end of the window, pulling the start back when they would cross
    pub fn set_end_hour(&mut self, hour: u8) {
        let hour = hour.clamp(MIN_END_HOUR, MAX_END_HOUR);
        self.end_hour = hour;
        if self.start_hour >= hour {
            self.start_hour = hour - 1;
        }
    }

    pub fn query(&self) -> String {
        format!("start_hour={}&end_hour={}", self.start_hour, self.end_hour)
    }
}

impl Default for TimeWindow {
    fn default() -> Self {
        TimeWindow {
            start_hour: MIN_START_HOUR,
            end_hour: MAX_END_HOUR,
        }
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:00-{:02}:00", self.start_hour, self.end_hour)
    }
}
