//! Output formatting for CLI results.

pub mod json;
pub mod table;

pub use json::JsonOutput;
pub use table::TableOutput;

use blend_core::config::{BlendConfig, EpochParameters};
use blend_core::scheduler::SchedulerStatus;
use blend_core::types::WindowCount;

/// Output formatter trait
pub trait OutputFormatter {
    /// Format one window read; `closed` marks a window that has been retired
    fn format_window(&self, window: &WindowCount, closed: bool) -> String;

    /// Format the windows left over at shutdown
    fn format_windows(&self, windows: &[WindowCount]) -> String;

    /// Format config values and the parameters derived from them
    fn format_params(&self, config: &BlendConfig, params: &EpochParameters) -> String;

    /// Format a scheduler status snapshot
    fn format_status(&self, status: &SchedulerStatus) -> String;

    /// Format a generic message
    fn format_message(&self, message: &str) -> String;
}

/// Get the appropriate formatter based on JSON flag
pub fn get_formatter(json: bool) -> Box<dyn OutputFormatter> {
    if json {
        Box::new(JsonOutput::new())
    } else {
        Box::new(TableOutput::new())
    }
}
