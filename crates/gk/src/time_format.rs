use crate::config::TimeMode;
use time::format_description::{parse_owned, parse_strftime_owned, OwnedFormatItem};
use time::OffsetDateTime;

const DEFAULT_ABSOLUTE_FORMAT: &str = "[year]-[month]-[day] [hour]:[minute]";

/// Formats commit and blame timestamps for display
#[derive(Debug, Clone)]
pub struct TimeFormatter {
    mode: TimeMode,
    format: Option<OwnedFormatItem>,
}

impl Default for TimeFormatter {
    fn default() -> Self {
        Self::new(TimeMode::default(), "")
    }
}

impl TimeFormatter {
    /// `format` is only used in absolute mode; `[year]-[month]` style or
    /// strftime (`%Y-%m`) style are both accepted.
    pub fn new(mode: TimeMode, format: &str) -> Self {
        let format = match mode {
            TimeMode::Relative => None,
            TimeMode::Absolute => {
                parse_format(format).or_else(|| parse_owned::<2>(DEFAULT_ABSOLUTE_FORMAT).ok())
            }
        };
        Self { mode, format }
    }

    pub fn format(&self, epoch: Option<i64>, now: i64) -> String {
        let Some(epoch) = epoch else {
            return "unknown".to_string();
        };
        match (self.mode, &self.format) {
            (TimeMode::Absolute, Some(format)) => {
                format_absolute(epoch, format).unwrap_or_else(|| "unknown".to_string())
            }
            _ => format_relative_age(epoch, now),
        }
    }
}

fn parse_format(format: &str) -> Option<OwnedFormatItem> {
    let trimmed = format.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.contains('%') {
        parse_strftime_owned(trimmed).ok()
    } else {
        parse_owned::<2>(trimmed).ok()
    }
}

fn format_absolute(epoch: i64, format: &OwnedFormatItem) -> Option<String> {
    let date_time = OffsetDateTime::from_unix_timestamp(epoch).ok()?;
    date_time.format(format).ok()
}

/// Coarse age for log rows: minutes and hours inside a day, then days,
/// months and years
pub fn format_relative_age(epoch: i64, now: i64) -> String {
    let age_secs = now.saturating_sub(epoch).max(0);
    let plural = |n: i64, unit: &str| {
        if n == 1 {
            format!("1 {unit} ago")
        } else {
            format!("{n} {unit}s ago")
        }
    };
    if age_secs < 60 {
        return "just now".to_string();
    }
    if age_secs < 3_600 {
        return plural(age_secs / 60, "minute");
    }
    if age_secs < 86_400 {
        return plural(age_secs / 3_600, "hour");
    }
    let age_days = age_secs / 86_400;
    if age_days < 30 {
        return plural(age_days, "day");
    }
    if age_days < 365 {
        return plural((age_days / 30).max(1), "month");
    }
    plural(age_days / 365, "year")
}

/// Current time as a unix timestamp
pub fn now_epoch() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000;

    #[test]
    fn test_relative_age() {
        assert_eq!(format_relative_age(NOW - 10, NOW), "just now");
        assert_eq!(format_relative_age(NOW - 120, NOW), "2 minutes ago");
        assert_eq!(format_relative_age(NOW - 3_600, NOW), "1 hour ago");
        assert_eq!(format_relative_age(NOW - 86_400, NOW), "1 day ago");
        assert_eq!(format_relative_age(NOW - 45 * 86_400, NOW), "1 month ago");
        assert_eq!(format_relative_age(NOW - 800 * 86_400, NOW), "2 years ago");
        // Clock skew: commits from the future read as fresh
        assert_eq!(format_relative_age(NOW + 500, NOW), "just now");
    }

    #[test]
    fn test_absolute_format() {
        let formatter = TimeFormatter::new(TimeMode::Absolute, "%Y-%m-%d");
        assert_eq!(formatter.format(Some(0), NOW), "1970-01-01");
        assert_eq!(formatter.format(None, NOW), "unknown");
    }

    #[test]
    fn test_bad_absolute_format_falls_back() {
        let formatter = TimeFormatter::new(TimeMode::Absolute, "[nonsense");
        assert_eq!(formatter.format(Some(0), NOW), "1970-01-01 00:00");
    }
}
