//! Progress bars and human-readable formatting
//!
//! One visual style for the whole workspace: ████████▓░░░░░░

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;

pub mod progress_style {
    /// indicatif wants (filled, current, empty).
    pub const PROGRESS_CHARS: &str = "█▓░";

    pub const SPINNER_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

    pub const ENCODE_TEMPLATE: &str =
        "{spinner:.green} {prefix:.cyan.bold} ▕{bar:35.green/black}▏ {percent:>3}% • ⏱️ {elapsed_precise} • {msg}";

    pub const SPINNER_TEMPLATE: &str =
        "{spinner:.green} {prefix:.cyan.bold} • ⏱️ {elapsed_precise} • {msg}";
}

/// Resolution of [`create_encode_bar`] positions.
pub const ENCODE_BAR_STEPS: u64 = 1000;

/// Bar for an encode of known length; position is in [`ENCODE_BAR_STEPS`].
pub fn create_encode_bar(prefix: &str, hidden: bool) -> ProgressBar {
    let pb = ProgressBar::new(ENCODE_BAR_STEPS);
    if hidden {
        pb.set_draw_target(ProgressDrawTarget::hidden());
        return pb;
    }
    if let Ok(style) = ProgressStyle::default_bar().template(progress_style::ENCODE_TEMPLATE) {
        pb.set_style(
            style
                .progress_chars(progress_style::PROGRESS_CHARS)
                .tick_chars(progress_style::SPINNER_CHARS),
        );
    }
    pb.set_prefix(prefix.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Spinner for an encode whose length is unknown.
pub fn create_spinner(prefix: &str, hidden: bool) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if hidden {
        spinner.set_draw_target(ProgressDrawTarget::hidden());
        return spinner;
    }
    if let Ok(style) = ProgressStyle::default_spinner().template(progress_style::SPINNER_TEMPLATE) {
        spinner.set_style(style.tick_chars(progress_style::SPINNER_CHARS));
    }
    spinner.set_prefix(prefix.to_string());
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}

/// `1536` -> `"1.5 KB"`. Binary units, one decimal, up to TB.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    for unit in UNITS {
        if value < 1024.0 {
            return format!("{:.1} {}", value, unit);
        }
        value /= 1024.0;
    }
    format!("{:.1} TB", value)
}

pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 3600 {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    } else if secs >= 60 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{:.1}s", duration.as_secs_f64())
    }
}
