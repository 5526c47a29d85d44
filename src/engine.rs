//! The session state machine.
//!
//! Every mutation here ends in [`Coordinator::recompute`], which is a pure
//! function of the session snapshot and the injected clock. Callers must
//! serialize invocations per session; see [`crate::store::SessionStore`].

use chrono::NaiveDate;
use log::{debug, info, warn};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

use crate::clock::Clock;
use crate::compromise::find_compromise;
use crate::data::{
    ConflictResolution, CoordinationOutcome, RawSlot, Session, SessionStatus, StudentId,
    StudentPreference, StudentWindow, TimeSlot, UpdateMode,
};
use crate::matcher::find_perfect_match;
use crate::normalize::{Diagnostic, normalize_slots, retain_current};

/// Outcome of a mutation plus whatever the normalizer had to say about the
/// records that came with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateReport {
    pub outcome: CoordinationOutcome,
    pub diagnostics: Vec<Diagnostic>,
}

/// What a recomputation decided, before it is written to the session.
struct Decision {
    status: SessionStatus,
    /// `None` leaves the committed schedule untouched.
    schedule: Option<TimeSlot>,
    conflict_resolution: ConflictResolution,
    students_accommodated: usize,
}

#[derive(Clone)]
pub struct Coordinator {
    clock: Arc<dyn Clock>,
}

impl Coordinator {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Coordinator { clock }
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.now().date()
    }

    /// Replaces the teacher's offered windows. Order is kept as given.
    pub fn set_teacher_availability(&self, session: &mut Session, raw: &[RawSlot]) -> UpdateReport {
        let normalized = normalize_slots(raw, self.clock.now());
        info!(
            "Session {}: teacher offers {} slots ({} dropped)",
            session.id,
            normalized.slots.len(),
            normalized.dropped().count()
        );
        session.teacher_availability = normalized.slots;
        self.report(session, normalized.diagnostics)
    }

    /// Enrolls a student, optionally replacing their windows with `initial`.
    pub fn join(
        &self,
        session: &mut Session,
        student_id: &str,
        initial: Option<&[RawSlot]>,
    ) -> UpdateReport {
        info!("Session {}: student {student_id} joins", session.id);
        session.enrolled_students.insert(student_id.to_string());
        match initial {
            Some(raw) => self.update_preferences(session, student_id, raw, UpdateMode::Replace),
            None => self.report(session, Vec::new()),
        }
    }

    /// Removes a student and their windows.
    ///
    /// Recomputation still runs when the roster empties; disposing of the
    /// session is up to the caller.
    pub fn leave(&self, session: &mut Session, student_id: &str) -> UpdateReport {
        info!("Session {}: student {student_id} leaves", session.id);
        session.enrolled_students.remove(student_id);
        session.student_preferences.remove(student_id);
        self.report(session, Vec::new())
    }

    /// Stores an enrolled student's windows, overwriting or merging per `mode`.
    /// Updates for students outside the roster are logged and dropped.
    ///
    /// A merge is keyed by calendar date alone: an incoming window replaces
    /// any existing window on its date, so at most one window per date
    /// survives a merge.
    pub fn update_preferences(
        &self,
        session: &mut Session,
        student_id: &str,
        raw: &[RawSlot],
        mode: UpdateMode,
    ) -> UpdateReport {
        let now = self.clock.now();
        let normalized = normalize_slots(raw, now);
        debug!(
            "Session {}: {mode:?} update for {student_id} with {} windows",
            session.id,
            normalized.slots.len()
        );

        if !session.enrolled_students.contains(student_id) {
            warn!(
                "Session {}: ignoring preferences from {student_id}, who is not enrolled",
                session.id
            );
            return self.report(session, normalized.diagnostics);
        }

        let preference = session
            .student_preferences
            .entry(student_id.to_string())
            .or_insert_with(|| StudentPreference {
                student_id: student_id.to_string(),
                windows: Vec::new(),
                last_updated: now,
            });
        match mode {
            UpdateMode::Replace => preference.windows = normalized.slots,
            UpdateMode::Merge => merge_by_date(&mut preference.windows, normalized.slots),
        }
        preference.last_updated = now;

        self.report(session, normalized.diagnostics)
    }

    /// Builds a throwaway session from a full snapshot and recomputes once.
    ///
    /// A student listed twice keeps only their last set of windows, as if
    /// they had joined twice.
    pub fn coordinate_snapshot<'a>(
        &self,
        teacher: &[RawSlot],
        students: impl IntoIterator<Item = (&'a str, &'a [RawSlot])>,
    ) -> UpdateReport {
        let now = self.clock.now();
        let mut session = Session::new(0);
        let teacher = normalize_slots(teacher, now);
        session.teacher_availability = teacher.slots;
        let mut diagnostics = teacher.diagnostics;

        for (student_id, raw) in students {
            let normalized = normalize_slots(raw, now);
            diagnostics.extend(normalized.diagnostics);
            session.enrolled_students.insert(student_id.to_string());
            session.student_preferences.insert(
                student_id.to_string(),
                StudentPreference {
                    student_id: student_id.to_string(),
                    windows: normalized.slots,
                    last_updated: now,
                },
            );
        }
        debug!(
            "Snapshot: {} teacher slots, {} students",
            session.teacher_availability.len(),
            session.enrolled_students.len()
        );

        self.report(&mut session, diagnostics)
    }

    /// Re-derives `schedule` and `status` from the current session state.
    pub fn recompute(&self, session: &mut Session) -> CoordinationOutcome {
        let started = Instant::now();
        let today = self.today();
        let teacher_availability = retain_current(&session.teacher_availability, today);
        let total_students = session.enrolled_students.len();

        let decision = {
            let student_windows: Vec<(&StudentId, Vec<TimeSlot>)> = session
                .enrolled_students
                .iter()
                .filter_map(|id| {
                    let preference = session.student_preferences.get(id)?;
                    Some((id, retain_current(&preference.windows, today)))
                })
                .collect();
            let pool: Vec<StudentWindow<'_>> = student_windows
                .iter()
                .flat_map(|(id, windows)| {
                    windows.iter().map(move |slot| StudentWindow {
                        student_id: id.as_str(),
                        slot,
                    })
                })
                .collect();
            decide(&teacher_availability, &pool, total_students)
        };

        session.status = decision.status;
        if let Some(schedule) = decision.schedule {
            session.schedule = Some(schedule);
        }

        info!(
            "Session {}: {} ({}) -> {:?} ({}/{} students) in {:.2?}",
            session.id,
            decision.conflict_resolution,
            decision.conflict_resolution.describe(),
            session.status,
            decision.students_accommodated,
            total_students,
            started.elapsed()
        );

        CoordinationOutcome {
            success: session.status != SessionStatus::Pending,
            conflict_resolution: decision.conflict_resolution,
            students_accommodated: decision.students_accommodated,
            total_students,
            status: session.status,
            schedule: session.schedule.clone(),
        }
    }

    fn report(&self, session: &mut Session, diagnostics: Vec<Diagnostic>) -> UpdateReport {
        UpdateReport {
            outcome: self.recompute(session),
            diagnostics,
        }
    }
}

fn decide(
    teacher_availability: &[TimeSlot],
    pool: &[StudentWindow<'_>],
    total_students: usize,
) -> Decision {
    let Some(first_slot) = teacher_availability.first() else {
        return Decision {
            status: SessionStatus::Pending,
            schedule: None,
            conflict_resolution: ConflictResolution::NoTeacherAvailability,
            students_accommodated: 0,
        };
    };

    if pool.is_empty() {
        return Decision {
            status: SessionStatus::Scheduled,
            schedule: Some(first_slot.clone()),
            conflict_resolution: ConflictResolution::UsingTeacherAvailabilityOnly,
            students_accommodated: 0,
        };
    }

    if let Some(matched) = find_perfect_match(teacher_availability, pool) {
        return Decision {
            status: SessionStatus::Scheduled,
            schedule: Some(matched),
            conflict_resolution: ConflictResolution::PerfectMatch,
            students_accommodated: total_students,
        };
    }

    match find_compromise(teacher_availability, pool, total_students) {
        Some(compromise) if compromise.students_accommodated > 0 => {
            let status = if compromise.students_accommodated == total_students {
                SessionStatus::Scheduled
            } else {
                SessionStatus::Coordinated
            };
            Decision {
                status,
                schedule: Some(compromise.timing),
                conflict_resolution: ConflictResolution::CompromiseSolution,
                students_accommodated: compromise.students_accommodated,
            }
        }
        _ => Decision {
            status: SessionStatus::Pending,
            schedule: None,
            conflict_resolution: ConflictResolution::NoSuitableTiming,
            students_accommodated: 0,
        },
    }
}

fn merge_by_date(existing: &mut Vec<TimeSlot>, incoming: Vec<TimeSlot>) {
    for window in incoming {
        match existing.iter_mut().find(|w| w.date == window.date) {
            Some(slot) => *slot = window,
            None => existing.push(window),
        }
    }
}
