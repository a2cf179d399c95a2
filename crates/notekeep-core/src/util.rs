//! Shared helpers for text normalization and timestamp display.

use chrono::{DateTime, Local, TimeZone, Utc};

/// Trim optional text, mapping `None` and blank values to `None`.
pub fn normalize_text_option(value: Option<String>) -> Option<String> {
    let value = value?;
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Check if a string starts with `http://` or `https://`.
pub fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

/// Truncate response bodies to 180 characters for error messages.
pub fn compact_text(value: &str) -> String {
    value.trim().chars().take(180).collect()
}

/// Day label for note lists: `Today`, `Yesterday`, or `Oct 3`.
pub fn format_relative_day<Tz: TimeZone>(when: &DateTime<Tz>, now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let days = now
        .date_naive()
        .signed_duration_since(when.date_naive())
        .num_days();
    match days {
        0 => "Today".to_string(),
        1 => "Yesterday".to_string(),
        _ => when.format("%b %-d").to_string(),
    }
}

/// Editor header label, e.g. `October 16, 2026 at 3:04 PM`, in local time.
pub fn format_last_edited(when: &DateTime<Utc>) -> String {
    when.with_timezone(&Local)
        .format("%B %-d, %Y at %-I:%M %p")
        .to_string()
}
