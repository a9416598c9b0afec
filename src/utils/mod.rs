//! Utility functions and helpers.

pub mod http;
pub mod log;
pub mod terminal;

use std::time::Duration;

/// Render a duration as `1h 02m 03s` / `2m 05s` / `7s`.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    let (hours, minutes, seconds) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if hours > 0 {
        format!("{hours}h {minutes:02}m {seconds:02}s")
    } else if minutes > 0 {
        format!("{minutes}m {seconds:02}s")
    } else {
        format!("{seconds}s")
    }
}
