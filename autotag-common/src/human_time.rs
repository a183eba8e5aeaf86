//! Human-readable duration formatting
//!
//! Used for the `eta` and `runtime` strings in status responses. Picks the
//! most compact form for the magnitude: `45s`, `2m 05s`, `1h 03m`.

/// Format a duration in whole seconds for status display.
///
/// Negative inputs (clock skew) clamp to zero.
///
/// # Examples
///
/// ```
/// use autotag_common::human_time::format_duration;
///
/// assert_eq!(format_duration(45.0), "45s");
/// assert_eq!(format_duration(125.0), "2m 05s");
/// assert_eq!(format_duration(3785.0), "1h 03m");
/// ```
pub fn format_duration(seconds: f64) -> String {
    let total = seconds.max(0.0).round() as u64;

    if total < 60 {
        format!("{}s", total)
    } else if total < 3600 {
        format!("{}m {:02}s", total / 60, total % 60)
    } else {
        format!("{}h {:02}m", total / 3600, (total % 3600) / 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seconds_format() {
        assert_eq!(format_duration(0.0), "0s");
        assert_eq!(format_duration(59.4), "59s");
    }

    #[test]
    fn test_minutes_format() {
        assert_eq!(format_duration(60.0), "1m 00s");
        assert_eq!(format_duration(119.6), "2m 00s");
        assert_eq!(format_duration(330.0), "5m 30s");
    }

    #[test]
    fn test_hours_format() {
        assert_eq!(format_duration(3600.0), "1h 00m");
        assert_eq!(format_duration(7380.0), "2h 03m");
    }

    #[test]
    fn test_negative_clamps_to_zero() {
        assert_eq!(format_duration(-12.0), "0s");
    }
}
