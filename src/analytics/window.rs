//! Reporting window strings such as `5m`, `1h`, `7d`.

use std::time::Duration;

/// Window used when a request names none.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60 * 60);

/// Longest window accepted, one year.
pub const MAX_WINDOW: Duration = Duration::from_secs(366 * 24 * 60 * 60);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WindowError {
    #[error("invalid window '{0}', expected a number followed by s, m, h, d or w")]
    Invalid(String),

    #[error("window '{0}' must be greater than zero")]
    Zero(String),

    #[error("window '{0}' exceeds the one year maximum")]
    TooLong(String),
}

/// Parse `<count><unit>` with unit `s`, `m`, `h`, `d` or `w`.
/// An empty string yields [`DEFAULT_WINDOW`].
pub fn parse_window(input: &str) -> Result<Duration, WindowError> {
    let s = input.trim();
    if s.is_empty() {
        return Ok(DEFAULT_WINDOW);
    }

    let invalid = || WindowError::Invalid(input.to_string());

    let split = s.find(|c: char| !c.is_ascii_digit()).ok_or_else(invalid)?;
    let (count, unit) = s.split_at(split);
    let count: u64 = count.parse().map_err(|_| invalid())?;

    let unit_secs = match unit {
        "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        "d" => 24 * 60 * 60,
        "w" => 7 * 24 * 60 * 60,
        _ => return Err(invalid()),
    };

    if count == 0 {
        return Err(WindowError::Zero(input.to_string()));
    }

    let secs = count
        .checked_mul(unit_secs)
        .ok_or_else(|| WindowError::TooLong(input.to_string()))?;
    let window = Duration::from_secs(secs);
    if window > MAX_WINDOW {
        return Err(WindowError::TooLong(input.to_string()));
    }
    Ok(window)
}

/// Shortest exact rendering, e.g. 3600s as `1h`, 90s as `90s`.
pub fn format_window(window: Duration) -> String {
    let secs = window.as_secs();
    for (unit, size) in [("w", 604_800), ("d", 86_400), ("h", 3_600), ("m", 60)] {
        if secs >= size && secs % size == 0 {
            return format!("{}{}", secs / size, unit);
        }
    }
    format!("{secs}s")
}
