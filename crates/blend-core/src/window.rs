//! Discovery window keys.
//!
//! A window key is a timestamp floored to a multiple of the window size.
//! Keys are computed on UTC epoch seconds, so they stay continuous across
//! daylight-saving transitions. Window sizes must divide an hour, which makes
//! every key land on a minute boundary that is also an hour/minute floor.

use chrono::{DateTime, Duration, Utc};

use crate::error::ConfigError;

const MINUTES_PER_HOUR: u32 = 60;

/// Size of an aggregation window in whole minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowSize {
    minutes: u32,
}

impl WindowSize {
    /// Create a window size. Must be in `1..=60` and divide 60.
    pub fn from_minutes(minutes: u32) -> Result<Self, ConfigError> {
        if minutes == 0 || minutes > MINUTES_PER_HOUR {
            return Err(ConfigError::invalid(
                "windowSizeMinutes",
                format!("{} is outside 1..=60", minutes),
            ));
        }

        if MINUTES_PER_HOUR % minutes != 0 {
            return Err(ConfigError::invalid(
                "windowSizeMinutes",
                format!("{} does not divide an hour", minutes),
            ));
        }

        Ok(Self { minutes })
    }

    pub fn minutes(&self) -> u32 {
        self.minutes
    }

    pub fn as_secs(&self) -> i64 {
        i64::from(self.minutes) * 60
    }

    pub fn length(&self) -> Duration {
        Duration::seconds(self.as_secs())
    }

    /// Start of the window containing `at`.
    pub fn window_start(&self, at: DateTime<Utc>) -> DateTime<Utc> {
        let into_window = at.timestamp().rem_euclid(self.as_secs());
        let subsec = i64::from(at.timestamp_subsec_nanos());
        at - Duration::seconds(into_window) - Duration::nanoseconds(subsec)
    }

    /// End (exclusive) of the window starting at `start`.
    pub fn window_end(&self, start: DateTime<Utc>) -> DateTime<Utc> {
        start + self.length()
    }
}
