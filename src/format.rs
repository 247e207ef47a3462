// vidmeta (video metadata inspector)
// Copyright (C) 2025 Andrew Nissen

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Raw capture timestamps look like `20230615T143000`, optionally followed by
/// fractional seconds and a zone marker which are ignored.
pub const DATE_INPUT_PATTERN: &str = "%Y%m%dT%H%M%S";
pub const DATE_OUTPUT_PATTERN: &str = "%B %d, %Y, %-I:%M %p";
pub const UNKNOWN_DATE: &str = "unknown date";

/// What to show when the capture date is missing or unparseable.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DatePolicy {
    /// Substitute the current wall-clock time.
    #[default]
    Now,
    Unknown,
}

impl fmt::Display for DatePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatePolicy::Now => write!(f, "now"),
            DatePolicy::Unknown => write!(f, "unknown"),
        }
    }
}

impl FromStr for DatePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "now" => Ok(DatePolicy::Now),
            "unknown" => Ok(DatePolicy::Unknown),
            other => Err(format!(
                "Invalid date_fallback value: {} (expected now or unknown)",
                other
            )),
        }
    }
}

/// Milliseconds to `minutes:seconds`. Seconds are not zero padded.
pub fn format_duration(ms: u64) -> String {
    let (minutes, seconds) = split_duration(ms);
    format!("{}:{}", minutes, seconds)
}

pub fn format_duration_with(ms: u64, pad_seconds: bool) -> String {
    if !pad_seconds {
        return format_duration(ms);
    }
    let (minutes, seconds) = split_duration(ms);
    format!("{}:{:02}", minutes, seconds)
}

fn split_duration(ms: u64) -> (u64, u64) {
    (ms / 60_000, (ms % 60_000) / 1000)
}

/// Decimal kilobytes, switching to megabytes (kb / 1024) at 1024 KB.
/// Both steps truncate.
pub fn format_size(bytes: u64) -> String {
    let size_kb = bytes / 1000;
    if size_kb >= 1024 {
        format!("{} MB", size_kb / 1024)
    } else {
        format!("{} KB", size_kb)
    }
}

pub fn parse_capture_date(raw: &str) -> Option<NaiveDateTime> {
    match NaiveDateTime::parse_and_remainder(raw, DATE_INPUT_PATTERN) {
        Ok((parsed, _rest)) => Some(parsed),
        Err(e) => {
            tracing::debug!("Could not parse capture date {:?}: {}", raw, e);
            None
        }
    }
}

pub fn format_date(raw: Option<&str>, policy: DatePolicy) -> String {
    format_date_at(raw, policy, Local::now().naive_local())
}

pub fn format_date_at(raw: Option<&str>, policy: DatePolicy, now: NaiveDateTime) -> String {
    match raw.and_then(parse_capture_date) {
        Some(timestamp) => timestamp.format(DATE_OUTPUT_PATTERN).to_string(),
        None => match policy {
            DatePolicy::Now => now.format(DATE_OUTPUT_PATTERN).to_string(),
            DatePolicy::Unknown => UNKNOWN_DATE.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use regex::Regex;

    fn fixed_now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(9, 5, 0)
            .unwrap()
    }

    #[test]
    fn test_duration_is_truncated_and_unpadded() {
        assert_eq!(format_duration(65_000), "1:5");
        assert_eq!(format_duration(3_000), "0:3");
        assert_eq!(format_duration(0), "0:0");
        assert_eq!(format_duration(59_999), "0:59");
        assert_eq!(format_duration(60_000), "1:0");
        assert_eq!(format_duration(3_600_000), "60:0");
        assert_eq!(format_duration(125_999), "2:5");
    }

    #[test]
    fn test_duration_padding_option() {
        assert_eq!(format_duration_with(65_000, true), "1:05");
        assert_eq!(format_duration_with(65_000, false), "1:5");
        assert_eq!(format_duration_with(600_000, true), "10:00");
    }

    #[test]
    fn test_size_truncates_instead_of_rounding() {
        assert_eq!(format_size(0), "0 KB");
        assert_eq!(format_size(999), "0 KB");
        assert_eq!(format_size(500_000), "500 KB");
        assert_eq!(format_size(1_023_999), "1023 KB");
        assert_eq!(format_size(1_024_000), "1 MB");
        // 2047 KB is still one megabyte
        assert_eq!(format_size(2_047_999), "1 MB");
        assert_eq!(format_size(2_048_000), "2 MB");
        assert_eq!(format_size(1_100_000_000), "1074 MB");
    }

    #[test]
    fn test_date_formats_capture_timestamp() {
        let formatted = format_date_at(Some("20230615T143000"), DatePolicy::Now, fixed_now());
        assert_eq!(formatted, "June 15, 2023, 2:30 PM");
        assert!(formatted.contains("June 15, 2023"));
        assert!(formatted.contains("2:30 PM"));
    }

    #[test]
    fn test_date_ignores_trailing_fraction_and_zone() {
        let formatted = format_date_at(Some("20230605T090700.000Z"), DatePolicy::Now, fixed_now());
        assert_eq!(formatted, "June 05, 2023, 9:07 AM");
    }

    #[test]
    fn test_date_midnight_and_noon() {
        let now = fixed_now();
        assert_eq!(
            format_date_at(Some("20231231T000000"), DatePolicy::Now, now),
            "December 31, 2023, 12:00 AM"
        );
        assert_eq!(
            format_date_at(Some("20231231T120100"), DatePolicy::Now, now),
            "December 31, 2023, 12:01 PM"
        );
    }

    #[test]
    fn test_unparseable_date_falls_back_to_now() {
        assert_eq!(
            format_date_at(Some("not-a-date"), DatePolicy::Now, fixed_now()),
            "January 02, 2024, 9:05 AM"
        );
        assert_eq!(
            format_date_at(None, DatePolicy::Now, fixed_now()),
            "January 02, 2024, 9:05 AM"
        );
    }

    #[test]
    fn test_fallback_with_real_clock_matches_output_pattern() {
        let pattern = Regex::new(r"^[A-Z][a-z]+ \d{2}, \d{4}, \d{1,2}:\d{2} (AM|PM)$").unwrap();
        assert!(pattern.is_match(&format_date(Some("not-a-date"), DatePolicy::Now)));
        assert!(pattern.is_match(&format_date(None, DatePolicy::Now)));
    }

    #[test]
    fn test_unknown_policy() {
        assert_eq!(
            format_date_at(Some("2023-06-15"), DatePolicy::Unknown, fixed_now()),
            UNKNOWN_DATE
        );
        assert_eq!(format_date_at(None, DatePolicy::Unknown, fixed_now()), UNKNOWN_DATE);
        assert_eq!(
            format_date_at(Some("20230615T143000"), DatePolicy::Unknown, fixed_now()),
            "June 15, 2023, 2:30 PM"
        );
    }

    #[test]
    fn test_date_policy_from_str() {
        assert_eq!("now".parse::<DatePolicy>(), Ok(DatePolicy::Now));
        assert_eq!("unknown".parse::<DatePolicy>(), Ok(DatePolicy::Unknown));
        assert!("never".parse::<DatePolicy>().is_err());
    }
}
