use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike, Weekday};
use serde::Serializer;

use crate::data::Minutes;
use crate::error::TimeError;

pub const MINUTES_PER_DAY: Minutes = 24 * 60;

/// Last local hour at which a same-weekday reference still resolves to today.
const SAME_DAY_CUTOFF_HOUR: u32 = 12;

/// Parses a 24-hour `HH:MM` string into minutes past midnight.
pub fn to_minutes(time: &str) -> Result<Minutes, TimeError> {
    let format_error = || TimeError::Format(time.to_string());

    let (hour, minute) = time.trim().split_once(':').ok_or_else(format_error)?;
    let hour = parse_digits(hour).ok_or_else(format_error)?;
    let minute = parse_digits(minute).ok_or_else(format_error)?;

    if hour > 23 || minute > 59 {
        return Err(format_error());
    }
    Ok(hour * 60 + minute)
}

/// Formats minutes past midnight as a zero-padded `HH:MM` string.
pub fn to_time_string(minutes: Minutes) -> Result<String, TimeError> {
    if minutes >= MINUTES_PER_DAY {
        return Err(TimeError::Range(minutes));
    }
    Ok(format!("{:02}:{:02}", minutes / 60, minutes % 60))
}

/// Parses either a 24-hour `HH:MM` string or a 12-hour one with an AM/PM
/// suffix (`2:30 PM`, `11am`, `12:15 a.m.`).
pub fn parse_clock_time(raw: &str) -> Result<Minutes, TimeError> {
    let format_error = || TimeError::Format(raw.to_string());

    let upper = raw.trim().to_ascii_uppercase().replace('.', "");
    let (clock, is_pm) = if let Some(rest) = upper.strip_suffix("AM") {
        (rest.trim_end(), false)
    } else if let Some(rest) = upper.strip_suffix("PM") {
        (rest.trim_end(), true)
    } else {
        return to_minutes(&upper).map_err(|_| format_error());
    };

    let (hour, minute) = clock.split_once(':').unwrap_or((clock, "00"));
    let hour = parse_digits(hour).ok_or_else(format_error)?;
    let minute = parse_digits(minute).ok_or_else(format_error)?;
    if !(1..=12).contains(&hour) {
        return Err(format_error());
    }

    let hour = match (hour, is_pm) {
        (12, false) => 0,
        (12, true) => 12,
        (h, true) => h + 12,
        (h, false) => h,
    };
    to_minutes(&format!("{hour:02}:{minute:02}")).map_err(|_| format_error())
}

/// Parses a weekday label such as `monday`, `Mon` or `TUESDAY`.
pub fn parse_weekday(name: &str) -> Option<Weekday> {
    name.trim().parse::<Weekday>().ok()
}

/// Maps a weekday to its next occurrence on or after the reference date.
///
/// When the reference date already falls on `weekday`, it resolves to today
/// up to and including the noon hour and to the same weekday next week after
/// that.
pub fn resolve_weekday_to_date(weekday: Weekday, reference: NaiveDateTime) -> NaiveDate {
    let today = reference.date();
    let target = weekday.num_days_from_monday();
    let current = today.weekday().num_days_from_monday();

    let days_ahead = match (target + 7 - current) % 7 {
        0 if reference.hour() <= SAME_DAY_CUTOFF_HOUR => 0,
        0 => 7,
        n => n,
    };
    today + Duration::days(i64::from(days_ahead))
}

/// Serializes a minute-of-day field as `HH:MM`.
pub fn serialize_hhmm<S: Serializer>(minutes: &Minutes, serializer: S) -> Result<S::Ok, S::Error> {
    let text = to_time_string(*minutes).map_err(serde::ser::Error::custom)?;
    serializer.serialize_str(&text)
}

fn parse_digits(part: &str) -> Option<Minutes> {
    if part.is_empty() || part.len() > 2 || !part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    part.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(date: &str, hour: u32) -> NaiveDateTime {
        NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    #[test]
    fn parses_24_hour_times() {
        assert_eq!(to_minutes("00:00"), Ok(0));
        assert_eq!(to_minutes("09:05"), Ok(545));
        assert_eq!(to_minutes("23:59"), Ok(1439));
        assert_eq!(to_minutes(" 7:30 "), Ok(450));
    }

    #[test]
    fn rejects_malformed_or_out_of_range_times() {
        for bad in ["24:00", "12:60", "ab:cd", "1230", "", "12:", "-1:00", "+1:00"] {
            assert_eq!(to_minutes(bad), Err(TimeError::Format(bad.to_string())), "{bad}");
        }
    }

    #[test]
    fn formats_minutes_zero_padded() {
        assert_eq!(to_time_string(0).unwrap(), "00:00");
        assert_eq!(to_time_string(545).unwrap(), "09:05");
        assert_eq!(to_time_string(1439).unwrap(), "23:59");
        assert_eq!(to_time_string(1440), Err(TimeError::Range(1440)));
    }

    #[test]
    fn converts_12_hour_times() {
        assert_eq!(parse_clock_time("2:30 PM"), Ok(14 * 60 + 30));
        assert_eq!(parse_clock_time("11am"), Ok(11 * 60));
        assert_eq!(parse_clock_time("12:15 a.m."), Ok(15));
        assert_eq!(parse_clock_time("12 PM"), Ok(12 * 60));
        assert_eq!(parse_clock_time("14:00"), Ok(14 * 60));
        assert!(parse_clock_time("13 PM").is_err());
        assert!(parse_clock_time("noon").is_err());
    }

    #[test]
    fn parses_weekday_names() {
        assert_eq!(parse_weekday("monday"), Some(Weekday::Mon));
        assert_eq!(parse_weekday("Fri"), Some(Weekday::Fri));
        assert_eq!(parse_weekday("someday"), None);
    }

    #[test]
    fn resolves_weekday_to_next_occurrence() {
        // 2025-06-30 is a Monday.
        assert_eq!(
            resolve_weekday_to_date(Weekday::Wed, at("2025-06-30", 9)),
            NaiveDate::from_ymd_opt(2025, 7, 2).unwrap()
        );
        assert_eq!(
            resolve_weekday_to_date(Weekday::Sun, at("2025-06-30", 9)),
            NaiveDate::from_ymd_opt(2025, 7, 6).unwrap()
        );
    }

    #[test]
    fn same_weekday_rolls_over_after_noon_hour() {
        let monday = NaiveDate::from_ymd_opt(2025, 6, 30).unwrap();
        assert_eq!(resolve_weekday_to_date(Weekday::Mon, at("2025-06-30", 12)), monday);
        assert_eq!(
            resolve_weekday_to_date(Weekday::Mon, at("2025-06-30", 13)),
            monday + Duration::days(7)
        );
    }
}
