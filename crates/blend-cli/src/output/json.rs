//! JSON-formatted output for CLI.

use serde::Serialize;
use serde_json::json;

use blend_core::config::{BlendConfig, EpochParameters};
use blend_core::scheduler::SchedulerStatus;
use blend_core::types::WindowCount;

use super::OutputFormatter;

pub struct JsonOutput;

impl JsonOutput {
    pub fn new() -> Self {
        Self
    }

    fn to_json<T: Serialize>(value: &T) -> String {
        serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
    }
}

impl Default for JsonOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputFormatter for JsonOutput {
    // One object per line so window reads can be streamed into other tools
    fn format_window(&self, window: &WindowCount, closed: bool) -> String {
        let output = json!({
            "windowStart": window.window_start,
            "appleCount": window.apple_count,
            "androidCount": window.android_count,
            "total": window.total(),
            "closed": closed,
        });
        output.to_string()
    }

    fn format_windows(&self, windows: &[WindowCount]) -> String {
        let output = json!({
            "windows": windows,
            "count": windows.len()
        });
        Self::to_json(&output)
    }

    fn format_params(&self, config: &BlendConfig, params: &EpochParameters) -> String {
        let output = json!({
            "config": config,
            "derived": {
                "scanMs": params.scan_duration().as_millis() as u64,
                "advertiseMs": params.advertise_duration().as_millis() as u64,
                "epochMs": params.epoch_duration().as_millis() as u64,
                "scanDutyCycle": params.scan_duty_cycle(),
                "windowSeconds": params.window_size().as_secs(),
                "retirementHorizonSeconds": params.retirement_horizon().as_secs(),
            }
        });
        Self::to_json(&output)
    }

    fn format_status(&self, status: &SchedulerStatus) -> String {
        Self::to_json(status)
    }

    fn format_message(&self, message: &str) -> String {
        json!({ "message": message }).to_string()
    }
}
