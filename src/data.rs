use chrono::{NaiveDate, NaiveDateTime, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::time::{serialize_hhmm, to_time_string};

// Type aliases for clarity
pub type Minutes = u32;
pub type StudentId = String;
pub type SessionId = u64;

/// A canonical availability window on one calendar date.
///
/// Built by the normalizer from a [`RawSlot`]; `start_time < end_time` and
/// both lie within the day.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSlot {
    pub date: NaiveDate,
    pub weekday: Weekday,
    #[serde(serialize_with = "serialize_hhmm")]
    pub start_time: Minutes,
    #[serde(serialize_with = "serialize_hhmm")]
    pub end_time: Minutes,
    pub timezone: String,
}

impl TimeSlot {
    /// Same date, weekday and timezone, narrowed to `start..end`.
    pub fn with_window(&self, start_time: Minutes, end_time: Minutes) -> TimeSlot {
        TimeSlot {
            start_time,
            end_time,
            ..self.clone()
        }
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let start = to_time_string(self.start_time).map_err(|_| fmt::Error)?;
        let end = to_time_string(self.end_time).map_err(|_| fmt::Error)?;
        write!(
            f,
            "{} ({}) {}-{} {}",
            self.date, self.weekday, start, end, self.timezone
        )
    }
}

/// A slot record as produced by the language-model extraction step.
///
/// Every field is loose text; nothing here is trusted until normalized.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSlot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day: Option<String>,
    #[serde(default)]
    pub start_time: String,
    #[serde(default)]
    pub end_time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
}

/// One student's preferred windows within a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentPreference {
    pub student_id: StudentId,
    pub windows: Vec<TimeSlot>,
    pub last_updated: NaiveDateTime,
}

/// A student window tagged with its owner, as pooled across the roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StudentWindow<'a> {
    pub student_id: &'a str,
    pub slot: &'a TimeSlot,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// No viable schedule yet.
    #[default]
    Pending,
    /// The schedule satisfies every enrolled student.
    Scheduled,
    /// The schedule satisfies a strict subset of the roster.
    Coordinated,
}

/// How a recomputation arrived at its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictResolution {
    PerfectMatch,
    CompromiseSolution,
    UsingTeacherAvailabilityOnly,
    NoTeacherAvailability,
    NoSuitableTiming,
}

impl ConflictResolution {
    /// Default phrasing for callers that do not generate their own.
    pub fn describe(&self) -> &'static str {
        match self {
            ConflictResolution::PerfectMatch => "found a time that works for everyone",
            ConflictResolution::CompromiseSolution => {
                "found the time that works for the most students"
            }
            ConflictResolution::UsingTeacherAvailabilityOnly => {
                "using the teacher's first available time until students share theirs"
            }
            ConflictResolution::NoTeacherAvailability => "waiting for the teacher's availability",
            ConflictResolution::NoSuitableTiming => {
                "no time fits any student's availability yet"
            }
        }
    }
}

impl fmt::Display for ConflictResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            ConflictResolution::PerfectMatch => "perfect_match",
            ConflictResolution::CompromiseSolution => "compromise_solution",
            ConflictResolution::UsingTeacherAvailabilityOnly => "using_teacher_availability_only",
            ConflictResolution::NoTeacherAvailability => "no_teacher_availability",
            ConflictResolution::NoSuitableTiming => "no_suitable_timing",
        };
        f.write_str(tag)
    }
}

/// The observable result of one recomputation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoordinationOutcome {
    pub success: bool,
    pub conflict_resolution: ConflictResolution,
    pub students_accommodated: usize,
    pub total_students: usize,
    pub status: SessionStatus,
    pub schedule: Option<TimeSlot>,
}

/// Whether a preference update overwrites or folds into existing windows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateMode {
    #[default]
    Replace,
    /// Incoming windows replace existing ones on the same date; others are appended.
    Merge,
}

/// The session aggregate the coordinator keeps consistent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: SessionId,
    /// Ordered; earlier slots win ties.
    pub teacher_availability: Vec<TimeSlot>,
    pub student_preferences: BTreeMap<StudentId, StudentPreference>,
    pub enrolled_students: BTreeSet<StudentId>,
    pub schedule: Option<TimeSlot>,
    pub status: SessionStatus,
}

impl Session {
    pub fn new(id: SessionId) -> Self {
        Session {
            id,
            ..Session::default()
        }
    }
}
