//! Table-formatted output for CLI.

use chrono::{DateTime, Local, Utc};
use colored::*;
use comfy_table::{Cell, CellAlignment, Color, ContentArrangement, Table};

use blend_core::config::{BlendConfig, EpochParameters};
use blend_core::scheduler::{Phase, SchedulerStatus};
use blend_core::types::WindowCount;

use super::OutputFormatter;

pub struct TableOutput;

impl TableOutput {
    pub fn new() -> Self {
        Self
    }

    fn local_time(at: DateTime<Utc>) -> String {
        at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
    }

    fn phase_label(phase: Phase) -> ColoredString {
        match phase {
            Phase::Stopped => phase.as_str().red(),
            Phase::Scanning => phase.as_str().cyan(),
            Phase::Advertising => phase.as_str().green(),
            Phase::Background => phase.as_str().yellow(),
        }
    }
}

impl Default for TableOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputFormatter for TableOutput {
    fn format_window(&self, window: &WindowCount, closed: bool) -> String {
        let state = if closed {
            "[closed]".green()
        } else {
            "[open]".yellow()
        };

        format!(
            "{} {}  apple {}  android {}  total {}",
            Self::local_time(window.window_start),
            state,
            window.apple_count,
            window.android_count,
            window.total().to_string().bold()
        )
    }

    fn format_windows(&self, windows: &[WindowCount]) -> String {
        if windows.is_empty() {
            return "No windows recorded.".to_string();
        }

        let mut table = Table::new();
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec!["Window Start", "Apple", "Android", "Total"]);

        for window in windows {
            table.add_row(vec![
                Cell::new(Self::local_time(window.window_start)),
                Cell::new(window.apple_count).set_alignment(CellAlignment::Right),
                Cell::new(window.android_count).set_alignment(CellAlignment::Right),
                Cell::new(window.total())
                    .set_alignment(CellAlignment::Right)
                    .fg(Color::Green),
            ]);
        }

        format!("{}\n\n{} window(s)", table, windows.len())
    }

    fn format_params(&self, config: &BlendConfig, params: &EpochParameters) -> String {
        let mut table = Table::new();
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec!["Parameter", "Value"]);

        let rows = [
            (
                "Scan duration",
                format!("{:.3} s", config.scan_duration_seconds),
            ),
            (
                "Epoch duration",
                format!("{:.3} s", config.epoch_duration_seconds),
            ),
            (
                "Advertise duration",
                format!("{:.3} s", params.advertise_duration().as_secs_f64()),
            ),
            (
                "Scan duty cycle",
                format!("{:.2} %", params.scan_duty_cycle() * 100.0),
            ),
            (
                "Window size",
                format!("{} min", config.window_size_minutes),
            ),
            (
                "Retirement grace",
                format!("{} s", config.retirement_grace_seconds),
            ),
            (
                "Retirement horizon",
                format!("{} s", params.retirement_horizon().as_secs()),
            ),
        ];

        for (name, value) in rows {
            table.add_row(vec![Cell::new(name), Cell::new(value)]);
        }

        table.to_string()
    }

    fn format_status(&self, status: &SchedulerStatus) -> String {
        let radio = if status.radio_state.is_available() {
            status.radio_state.as_str().green()
        } else {
            status.radio_state.as_str().red()
        };
        let yes_no = |v: bool| if v { "yes" } else { "no" };

        let lines = [
            format!("Scheduler: {}", Self::phase_label(status.phase)),
            format!("  Running:     {}", yes_no(status.schedule_running)),
            format!("  Scanning:    {}", yes_no(status.is_scanning)),
            format!("  Advertising: {}", yes_no(status.is_advertising)),
            format!("  Epochs:      {}", status.epochs_completed),
            format!("  Radio:       {}", radio),
        ];

        lines.join("\n")
    }

    fn format_message(&self, message: &str) -> String {
        message.to_string()
    }
}
