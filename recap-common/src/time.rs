//! `[MM:SS]` / `[HH:MM:SS]` timestamp formatting and parsing.
//!
//! Two components always mean minutes:seconds, three mean
//! hours:minutes:seconds. Formatting then parsing a value returns the
//! original number of seconds.

/// Format whole seconds as `[MM:SS]`, or `[HH:MM:SS]` beyond an hour.
pub fn format_timestamp(total_seconds: u32) -> String {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("[{:02}:{:02}:{:02}]", hours, minutes, seconds)
    } else {
        format!("[{:02}:{:02}]", minutes, seconds)
    }
}

/// Parse a `[MM:SS]` or `[HH:MM:SS]` marker (brackets optional) into seconds.
///
/// Each capture is converted directly; no field reuse between the two forms.
pub fn parse_timestamp(marker: &str) -> Option<u32> {
    let inner = marker.trim().trim_start_matches('[').trim_end_matches(']');
    let parts: Vec<&str> = inner.split(':').collect();

    let as_u32 = |s: &str| -> Option<u32> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        s.parse().ok()
    };

    match parts.as_slice() {
        [m, s] => Some(as_u32(m)? * 60 + as_u32(s)?),
        [h, m, s] => Some(as_u32(h)? * 3600 + as_u32(m)? * 60 + as_u32(s)?),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_minutes_seconds() {
        assert_eq!(format_timestamp(0), "[00:00]");
        assert_eq!(format_timestamp(75), "[01:15]");
        assert_eq!(format_timestamp(3599), "[59:59]");
    }

    #[test]
    fn formats_hours_past_sixty_minutes() {
        assert_eq!(format_timestamp(3600), "[01:00:00]");
        assert_eq!(format_timestamp(7215), "[02:00:15]");
    }

    #[test]
    fn parses_both_forms() {
        assert_eq!(parse_timestamp("[01:15]"), Some(75));
        assert_eq!(parse_timestamp("[01:00:00]"), Some(3600));
        assert_eq!(parse_timestamp("02:00:15"), Some(7215));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_timestamp("[1]"), None);
        assert_eq!(parse_timestamp("[aa:bb]"), None);
        assert_eq!(parse_timestamp(""), None);
    }

    #[test]
    fn format_parse_round_trip() {
        for seconds in [0u32, 1, 59, 60, 61, 599, 3599, 3600, 3661, 7215, 35999] {
            let formatted = format_timestamp(seconds);
            assert_eq!(
                parse_timestamp(&formatted),
                Some(seconds),
                "round trip failed for {seconds} ({formatted})"
            );
        }
    }
}
