//! `MM:SS` rendering for progress and duration labels.

/// Render seconds as zero-padded `MM:SS`, truncating fractions.
///
/// Negative and non-finite input renders as `00:00`. Minutes are not wrapped
/// into hours.
///
/// ```
/// use core_playback::format_time;
///
/// assert_eq!(format_time(75.9), "01:15");
/// ```
pub fn format_time(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.trunc() as u64
    } else {
        0
    };
    format!("{:02}:{:02}", total / 60, total % 60)
}

/// Like [`format_time`], but a non-positive duration (unknown) renders empty.
pub fn format_duration(seconds: f64) -> String {
    if seconds > 0.0 {
        format_time(seconds)
    } else {
        String::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_time() {
        assert_eq!(format_time(0.0), "00:00");
        assert_eq!(format_time(75.0), "01:15");
        assert_eq!(format_time(9.99), "00:09");
        assert_eq!(format_time(600.0), "10:00");
        assert_eq!(format_time(7505.0), "125:05");
    }

    #[test]
    fn clamps_invalid_time() {
        assert_eq!(format_time(-3.0), "00:00");
        assert_eq!(format_time(f64::NAN), "00:00");
        assert_eq!(format_time(f64::INFINITY), "00:00");
    }

    #[test]
    fn unknown_duration_is_empty() {
        assert_eq!(format_duration(-1.0), "");
        assert_eq!(format_duration(0.0), "");
        assert_eq!(format_duration(f64::NAN), "");
        assert_eq!(format_duration(61.5), "01:01");
    }
}
