//! Scheduler phases and status snapshots.

use std::fmt;

use serde::Serialize;

use crate::transport::RadioState;

/// Where the scheduler is in its duty cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Stopped,
    Scanning,
    Advertising,
    /// Continuous scan and advertise; the epoch timer is suspended.
    Background,
}

impl Phase {
    pub fn is_scanning(&self) -> bool {
        matches!(self, Phase::Scanning | Phase::Background)
    }

    pub fn is_advertising(&self) -> bool {
        matches!(self, Phase::Advertising | Phase::Background)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Stopped => "stopped",
            Phase::Scanning => "scanning",
            Phase::Advertising => "advertising",
            Phase::Background => "background",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time view of a scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerStatus {
    pub phase: Phase,
    pub schedule_running: bool,
    pub is_scanning: bool,
    pub is_advertising: bool,
    pub epochs_completed: u64,
    pub radio_state: RadioState,
}
