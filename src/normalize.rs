//! Canonicalization of extracted availability records.
//!
//! The extraction step upstream is best-effort, so this stage never fails
//! a whole list: a bad slot is dropped, a bad time field is defaulted, and
//! every such decision is reported back as a [`Diagnostic`].

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use log::{debug, warn};
use serde::Serialize;

use crate::data::{Minutes, RawSlot, TimeSlot};
use crate::time::{parse_clock_time, parse_weekday, resolve_weekday_to_date};

/// Substituted for any time field that cannot be parsed.
pub const DEFAULT_TIME: Minutes = 9 * 60;
pub const DEFAULT_TIMEZONE: &str = "UTC";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", rename_all_fields = "camelCase", tag = "kind")]
pub enum SlotIssue {
    /// The slot was kept with `09:00` in place of an unreadable time.
    TimeDefaulted { field: TimeField, raw: String },
    PastDate { date: NaiveDate },
    /// Neither a usable date nor a weekday label.
    MissingDate,
    InvalidDate { raw: String },
    EmptyWindow { start_time: Minutes, end_time: Minutes },
}

impl SlotIssue {
    pub fn drops_slot(&self) -> bool {
        !matches!(self, SlotIssue::TimeDefaulted { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TimeField {
    StartTime,
    EndTime,
}

/// An issue tied to the position of the offending record in its input list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub index: usize,
    #[serde(flatten)]
    pub issue: SlotIssue,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Normalized {
    pub slots: Vec<TimeSlot>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Normalized {
    pub fn dropped(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.issue.drops_slot())
    }
}

/// Normalizes a list of raw slots relative to `now`, preserving input order.
pub fn normalize_slots(raw: &[RawSlot], now: NaiveDateTime) -> Normalized {
    let mut normalized = Normalized::default();
    for (index, record) in raw.iter().enumerate() {
        let mut issues = Vec::new();
        let slot = normalize_slot(record, now, &mut issues);
        for issue in issues {
            if issue.drops_slot() {
                warn!("Dropping slot #{index} ({record:?}): {issue:?}");
            } else {
                debug!("Slot #{index}: {issue:?}");
            }
            normalized.diagnostics.push(Diagnostic { index, issue });
        }
        normalized.slots.extend(slot);
    }
    normalized
}

fn normalize_slot(
    raw: &RawSlot,
    now: NaiveDateTime,
    issues: &mut Vec<SlotIssue>,
) -> Option<TimeSlot> {
    let date = match resolve_date(raw, now) {
        Ok(date) => date,
        Err(issue) => {
            issues.push(issue);
            return None;
        }
    };
    if date < now.date() {
        issues.push(SlotIssue::PastDate { date });
        return None;
    }

    let mut time_or_default = |field: TimeField, text: &str| {
        parse_clock_time(text).unwrap_or_else(|_| {
            issues.push(SlotIssue::TimeDefaulted {
                field,
                raw: text.to_string(),
            });
            DEFAULT_TIME
        })
    };
    let start_time = time_or_default(TimeField::StartTime, &raw.start_time);
    let end_time = time_or_default(TimeField::EndTime, &raw.end_time);
    if start_time >= end_time {
        issues.push(SlotIssue::EmptyWindow {
            start_time,
            end_time,
        });
        return None;
    }

    let timezone = raw
        .timezone
        .as_deref()
        .map(str::trim)
        .filter(|tz| !tz.is_empty())
        .unwrap_or(DEFAULT_TIMEZONE)
        .to_string();

    Some(TimeSlot {
        date,
        weekday: date.weekday(),
        start_time,
        end_time,
        timezone,
    })
}

/// An explicit date wins; the weekday label is only a fallback.
fn resolve_date(raw: &RawSlot, now: NaiveDateTime) -> Result<NaiveDate, SlotIssue> {
    let explicit = raw.date.as_deref().map(str::trim).filter(|d| !d.is_empty());
    if let Some(text) = explicit {
        if let Some(date) = parse_iso_date(text) {
            return Ok(date);
        }
        debug!("Unreadable date {text:?}, falling back to weekday label");
    }

    match raw.day.as_deref().and_then(parse_weekday) {
        Some(weekday) => Ok(resolve_weekday_to_date(weekday, now)),
        None => match explicit {
            Some(text) => Err(SlotIssue::InvalidDate {
                raw: text.to_string(),
            }),
            None => Err(SlotIssue::MissingDate),
        },
    }
}

/// Accepts `YYYY-MM-DD`, optionally followed by a `T...` time part.
fn parse_iso_date(text: &str) -> Option<NaiveDate> {
    let day_part = text.split_once('T').map_or(text, |(day, _)| day);
    NaiveDate::parse_from_str(day_part, "%Y-%m-%d").ok()
}

/// Drops stored slots that have aged into the past.
pub fn retain_current(slots: &[TimeSlot], today: NaiveDate) -> Vec<TimeSlot> {
    slots
        .iter()
        .filter(|slot| {
            let current = slot.date >= today;
            if !current {
                debug!("Slot {slot} has expired");
            }
            current
        })
        .cloned()
        .collect()
}
